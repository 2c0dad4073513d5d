//! Single-use CSRF tokens.
//!
//! A token is the first 32 hex characters of
//! `sha256("{secret}:{identifier}:{issued_ms}:{random}")`. Verifying a token
//! removes it whether or not it is still valid, so each token is good for at
//! most one submission.

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{CsrfConfig, DEFAULT_CSRF_SECRET};

/// Token length in hex characters.
pub const TOKEN_LEN: usize = 32;

/// Random bytes mixed into each token.
const NONCE_BYTES: usize = 16;

/// Storage for outstanding tokens and their expiry (ms since epoch).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: String, expires_at_ms: i64);

    /// Removes and returns the expiry of `token`, if present.
    async fn take(&self, token: &str) -> Option<i64>;

    /// Removes tokens that expired before `now_ms`. Returns how many were removed.
    async fn purge_expired(&self, now_ms: i64) -> usize;

    async fn len(&self) -> u64;
}

/// In-process token store backed by a bounded moka cache.
///
/// The cache TTL matches the token lifetime, so entries the sweep misses
/// still age out. Eviction is LRU: when full, the oldest tokens go and new
/// ones are always admitted.
#[derive(Clone)]
pub struct MokaTokenStore {
    cache: Cache<String, i64>,
}

impl MokaTokenStore {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
        }
    }
}

#[async_trait]
impl TokenStore for MokaTokenStore {
    async fn insert(&self, token: String, expires_at_ms: i64) {
        self.cache.insert(token, expires_at_ms).await;
    }

    async fn take(&self, token: &str) -> Option<i64> {
        self.cache.remove(token).await
    }

    async fn purge_expired(&self, now_ms: i64) -> usize {
        let expired: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(_, expires_at)| *expires_at < now_ms)
            .map(|(token, _)| token)
            .collect();

        for token in &expired {
            self.cache.invalidate(token.as_str()).await;
        }
        self.cache.run_pending_tasks().await;

        expired.len()
    }

    async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

/// Issues and verifies CSRF tokens.
pub struct CsrfGuard {
    secret: String,
    ttl: Duration,
    store: Arc<dyn TokenStore>,
}

impl CsrfGuard {
    pub fn new(config: &CsrfConfig) -> Self {
        let store = MokaTokenStore::new(config.ttl(), config.max_tokens);
        let guard = Self::with_store(config.secret.clone(), config.ttl(), Arc::new(store));
        if guard.uses_default_secret() {
            warn!("CSRF_SECRET is not set; using the development default");
        }
        guard
    }

    pub fn with_store(secret: impl Into<String>, ttl: Duration, store: Arc<dyn TokenStore>) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            store,
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_CSRF_SECRET
    }

    /// Issue a token bound to `identifier` (typically the client IP).
    pub async fn issue(&self, identifier: &str) -> String {
        self.issue_at(identifier, Utc::now().timestamp_millis()).await
    }

    pub async fn issue_at(&self, identifier: &str, now_ms: i64) -> String {
        let token = derive_token(&self.secret, identifier, now_ms, &random_hex(NONCE_BYTES));
        let expires_at = now_ms + self.ttl.as_millis() as i64;
        self.store.insert(token.clone(), expires_at).await;
        token
    }

    /// Verify and consume a token.
    pub async fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now().timestamp_millis()).await
    }

    pub async fn verify_at(&self, token: &str, now_ms: i64) -> bool {
        if !is_well_formed(token) {
            debug!("Malformed CSRF token");
            return false;
        }

        match self.store.take(token).await {
            None => {
                debug!("Unknown or already used CSRF token");
                false
            }
            Some(expires_at) if expires_at < now_ms => {
                debug!("Expired CSRF token");
                false
            }
            Some(_) => true,
        }
    }

    /// Remove expired tokens.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp_millis()).await
    }

    pub async fn sweep_at(&self, now_ms: i64) -> usize {
        let removed = self.store.purge_expired(now_ms).await;
        if removed > 0 {
            debug!(removed, "Swept expired CSRF tokens");
        }
        removed
    }

    pub async fn outstanding(&self) -> u64 {
        self.store.len().await
    }
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

fn derive_token(secret: &str, identifier: &str, timestamp_ms: i64, nonce: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}:{}", secret, identifier, timestamp_ms, nonce));
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(TOKEN_LEN);
    digest
}

fn random_hex(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

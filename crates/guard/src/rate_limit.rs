//! Fixed-window rate limiting.
//!
//! The first request from a key opens a window and is admitted. Later
//! requests inside the window are admitted until the count reaches the
//! maximum; after that they are rejected until the window elapses. Windows
//! are evaluated lazily on access.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RateLimitConfig;
use crate::snapshot::SnapshotFile;

/// Per-key window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEntry {
    pub count: u32,
    /// Window start, milliseconds since epoch
    pub window_start: i64,
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_in: Duration,
}

impl RateLimitDecision {
    /// Whole seconds a rejected client should wait, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let ms = self.reset_in.as_millis() as u64;
        ms.div_ceil(1000).max(1)
    }
}

/// Window length and admission bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    /// Applies one request to an entry. Returns the updated entry and the decision.
    pub fn apply(
        &self,
        entry: Option<RateLimitEntry>,
        now_ms: i64,
    ) -> (RateLimitEntry, RateLimitDecision) {
        let window_ms = self.window_ms();

        let current = match entry {
            Some(e) if now_ms - e.window_start < window_ms => e,
            _ => {
                let fresh = RateLimitEntry {
                    count: 1,
                    window_start: now_ms,
                };
                return (
                    fresh,
                    RateLimitDecision {
                        allowed: true,
                        remaining: self.max_requests - 1,
                        reset_in: self.window,
                    },
                );
            }
        };

        let elapsed = (now_ms - current.window_start).max(0);
        let reset_in = Duration::from_millis((window_ms - elapsed).max(0) as u64);

        if current.count >= self.max_requests {
            return (
                current,
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_in,
                },
            );
        }

        let remaining = self.max_requests.saturating_sub(current.count + 1);
        let updated = RateLimitEntry {
            count: current.count + 1,
            ..current
        };

        (
            updated,
            RateLimitDecision {
                allowed: true,
                remaining,
                reset_in,
            },
        )
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }
}

/// Storage for rate limit windows.
///
/// `hit` must read, update and write an entry atomically with respect to
/// other calls for the same key.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(&self, key: &str, now_ms: i64, policy: &RateLimitPolicy) -> RateLimitDecision;

    async fn remove(&self, key: &str);

    /// Drops entries whose window started before `cutoff_ms`. Returns how many were dropped.
    async fn purge_before(&self, cutoff_ms: i64) -> usize;

    async fn entries(&self) -> Vec<(String, RateLimitEntry)>;

    async fn restore(&self, entries: Vec<(String, RateLimitEntry)>);
}

/// Single-process rate limit store.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.lock().is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, now_ms: i64, policy: &RateLimitPolicy) -> RateLimitDecision {
        let mut windows = self.windows.lock();
        let (entry, decision) = policy.apply(windows.get(key).copied(), now_ms);
        windows.insert(key.to_string(), entry);
        decision
    }

    async fn remove(&self, key: &str) {
        self.windows.lock().remove(key);
    }

    async fn purge_before(&self, cutoff_ms: i64) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, entry| entry.window_start >= cutoff_ms);
        before - windows.len()
    }

    async fn entries(&self) -> Vec<(String, RateLimitEntry)> {
        self.windows
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    async fn restore(&self, entries: Vec<(String, RateLimitEntry)>) {
        self.windows.lock().extend(entries);
    }
}

/// Rate limiter over a pluggable store.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
    snapshot: Option<SnapshotFile>,
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;

impl RateLimiter {
    /// Creates an in-memory limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = Self::with_store(Arc::new(MemoryRateLimitStore::new()), config.into());
        match config.snapshot_path {
            Some(ref path) => limiter.with_snapshot(path),
            None => limiter,
        }
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy,
            snapshot: None,
        }
    }

    /// Enables periodic file snapshots at `path`.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(SnapshotFile::new(path));
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Check if a request from `key` is admitted.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now().timestamp_millis()).await
    }

    pub async fn check_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let decision = self.store.hit(key, now_ms, &self.policy).await;
        if !decision.allowed {
            debug!(key = %key, reset_in_ms = decision.reset_in.as_millis() as u64, "Rate limited");
        }
        decision
    }

    /// Forget the window for `key`.
    pub async fn reset(&self, key: &str) {
        self.store.remove(key).await;
    }

    /// Age after which an entry is no longer worth keeping.
    fn stale_after_ms(&self) -> i64 {
        self.policy.window_ms() * 2
    }

    /// Clean up windows older than two window lengths.
    pub async fn cleanup_stale(&self) -> usize {
        self.cleanup_stale_at(Utc::now().timestamp_millis()).await
    }

    pub async fn cleanup_stale_at(&self, now_ms: i64) -> usize {
        let removed = self.store.purge_before(now_ms - self.stale_after_ms()).await;
        if removed > 0 {
            debug!(removed, "Purged stale rate limit windows");
        }
        removed
    }

    /// Load windows from the snapshot file, if one is configured.
    pub async fn restore_snapshot(&self) -> intake_core::Result<usize> {
        let Some(ref snapshot) = self.snapshot else {
            return Ok(0);
        };

        let now_ms = Utc::now().timestamp_millis();
        let entries = snapshot.load(now_ms, self.stale_after_ms()).await?;
        let count = entries.len();
        self.store.restore(entries).await;

        info!(path = %snapshot.path().display(), restored = count, "Restored rate limit snapshot");
        Ok(count)
    }

    /// Write recent windows to the snapshot file, if one is configured.
    pub async fn save_snapshot(&self) -> intake_core::Result<usize> {
        let Some(ref snapshot) = self.snapshot else {
            return Ok(0);
        };

        let now_ms = Utc::now().timestamp_millis();
        let cutoff = now_ms - self.stale_after_ms();
        let entries: Vec<_> = self
            .store
            .entries()
            .await
            .into_iter()
            .filter(|(_, e)| e.window_start >= cutoff)
            .collect();
        let count = entries.len();

        snapshot.save(entries).await?;
        debug!(saved = count, "Saved rate limit snapshot");
        Ok(count)
    }
}

//! Application state shared across handlers.

use delivery::SubmissionForwarder;
use guard::{BotScorer, CsrfGuard, RateLimitConfig, RateLimiter, SharedRateLimiter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::SubmissionStore;
use worker::DispatcherHandle;

/// Which optional integrations are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrations {
    pub webhook: bool,
    pub email: bool,
    pub database: bool,
    pub recaptcha: bool,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Per-client fixed-window limiter
    pub rate_limiter: SharedRateLimiter,
    /// Per-client limiter for CSRF token issuance
    pub token_limiter: SharedRateLimiter,
    /// CSRF token issuer and verifier
    pub csrf: Arc<CsrfGuard>,
    /// Reject submissions without a CSRF token
    pub csrf_required: bool,
    /// Bot scorer; submissions are refused with a configuration error when unset
    pub scorer: Option<Arc<dyn BotScorer>>,
    /// Durable store, when configured
    pub store: Option<Arc<dyn SubmissionStore>>,
    /// Webhook forwarder, when configured
    pub forwarder: Option<Arc<dyn SubmissionForwarder>>,
    /// Whether the dispatcher has a mailer
    pub email_enabled: bool,
    /// Background delivery queue
    pub dispatcher: DispatcherHandle,
    /// Bearer token for the admin listing (listing disabled when unset)
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        rate_limiter: SharedRateLimiter,
        csrf: Arc<CsrfGuard>,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            rate_limiter,
            token_limiter: Arc::new(RateLimiter::new(&RateLimitConfig::token_issuance())),
            csrf,
            csrf_required: true,
            scorer: None,
            store: None,
            forwarder: None,
            email_enabled: false,
            dispatcher,
            admin_token: None,
        }
    }

    pub fn with_token_limiter(mut self, limiter: SharedRateLimiter) -> Self {
        self.token_limiter = limiter;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn BotScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SubmissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn SubmissionForwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn with_email(mut self, enabled: bool) -> Self {
        self.email_enabled = enabled;
        self
    }

    pub fn with_csrf_required(mut self, required: bool) -> Self {
        self.csrf_required = required;
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn integrations(&self) -> Integrations {
        Integrations {
            webhook: self.forwarder.is_some(),
            email: self.email_enabled,
            database: self.store.is_some(),
            recaptcha: self.scorer.is_some(),
        }
    }
}

//! Anti-abuse guards for the lead gateway.
//!
//! - Fixed-window rate limiting per client address, with optional file snapshots
//! - Single-use CSRF tokens
//! - Bot-score verification against reCAPTCHA v3

pub mod config;
pub mod csrf;
pub mod rate_limit;
pub mod recaptcha;
pub mod snapshot;

pub use config::*;
pub use csrf::{CsrfGuard, MokaTokenStore, TokenStore};
pub use rate_limit::{
    MemoryRateLimitStore, RateLimitDecision, RateLimitEntry, RateLimitPolicy, RateLimitStore,
    RateLimiter, SharedRateLimiter,
};
pub use recaptcha::{BotScorer, BotVerdict, RecaptchaVerifier, SiteVerifyResponse};

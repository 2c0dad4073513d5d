//! Guard configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Development fallback for the CSRF secret. A warning is logged when in use.
pub const DEFAULT_CSRF_SECRET: &str = "default-csrf-secret-change-in-production";

/// Default reCAPTCHA site-verify endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Configuration for all guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Contact submissions per client
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// CSRF token issuance per client
    #[serde(default = "RateLimitConfig::token_issuance")]
    pub token_rate_limit: RateLimitConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,
}

/// Fixed-window rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per key per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// JSON snapshot file for restart resilience (disabled when unset)
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

/// CSRF token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Server secret mixed into token derivation
    #[serde(default = "default_csrf_secret")]
    pub secret: String,
    /// Token lifetime in seconds
    #[serde(default = "default_csrf_ttl_secs")]
    pub ttl_secs: u64,
    /// Reject submissions that carry no CSRF token
    #[serde(default = "default_true")]
    pub required: bool,
    /// Upper bound on outstanding tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
}

/// Bot-score verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecaptchaConfig {
    /// Server-side secret; submissions are refused while unset
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    /// Minimum passing score (inclusive)
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    10 * 60 * 1000
}

fn default_csrf_secret() -> String {
    DEFAULT_CSRF_SECRET.to_string()
}

fn default_csrf_ttl_secs() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u64 {
    100_000
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            token_rate_limit: RateLimitConfig::token_issuance(),
            csrf: CsrfConfig::default(),
            recaptcha: RecaptchaConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            snapshot_path: None,
        }
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            secret: default_csrf_secret(),
            ttl_secs: default_csrf_ttl_secs(),
            required: default_true(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for RecaptchaConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            verify_url: default_verify_url(),
            threshold: default_threshold(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Default bound for `GET /api/csrf-token`: 20 tokens per client per minute.
    pub fn token_issuance() -> Self {
        Self {
            max_requests: 20,
            window_ms: 60 * 1000,
            snapshot_path: None,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl CsrfConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl RecaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

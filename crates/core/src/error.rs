//! Unified error types for the lead gateway.
//!
//! Error codes:
//! - VALID_001-002: Malformed requests and field validation
//! - SEC_001: Abuse-signal rejections (CSRF, bot score)
//! - RATE_001: Rate limit errors
//! - CONF_001: Missing configuration
//! - DB_001: Storage errors
//! - DELIV_001: Inline delivery errors

use thiserror::Error;

use crate::validation::FieldErrors;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / missing verification token
    InvalidFormat,
    /// VALID_002: One or more form fields failed validation
    InvalidFields,
}

impl ValidationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::InvalidFields => "VALID_002",
        }
    }

    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Abuse-signal error codes.
///
/// CSRF and bot-score failures intentionally share one code so a client
/// cannot tell which check rejected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityErrorCode {
    /// SEC_001: Submission could not be verified
    VerificationFailed,
}

impl SecurityErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "SEC_001",
        }
    }

    pub fn http_status(&self) -> u16 {
        403
    }
}

/// Rate limit error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitErrorCode {
    /// RATE_001: Rate limit exceeded
    Exceeded,
}

impl RateLimitErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Exceeded => "RATE_001",
        }
    }

    pub fn http_status(&self) -> u16 {
        429
    }
}

/// Which abuse check rejected a submission. Logged server-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityCheck {
    Csrf,
    BotScore,
}

impl std::fmt::Display for SecurityCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csrf => f.write_str("csrf"),
            Self::BotScore => f.write_str("bot_score"),
        }
    }
}

/// Unified error type for the lead gateway.
#[derive(Debug, Error)]
pub enum Error {
    /// Request body could not be understood.
    #[error("[VALID_001] {0}")]
    InvalidFormat(String),

    /// One or more fields failed validation.
    #[error("[VALID_002] {} field(s) failed validation", errors.len())]
    InvalidFields { errors: FieldErrors },

    /// CSRF or bot-score rejection.
    #[error("[SEC_001] {check} check failed: {reason}")]
    Security {
        check: SecurityCheck,
        reason: String,
    },

    /// Too many submissions from one client.
    #[error("[RATE_001] rate limit exceeded, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// A required secret or channel is not configured.
    #[error("[CONF_001] configuration error: {0}")]
    Config(String),

    /// Submission store failure.
    #[error("[DB_001] storage error: {0}")]
    Storage(String),

    /// Inline delivery failure (webhook used as the durable channel).
    #[error("[DELIV_001] delivery error: {0}")]
    Delivery(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn invalid_fields(errors: FieldErrors) -> Self {
        Self::InvalidFields { errors }
    }

    pub fn security(check: SecurityCheck, reason: impl Into<String>) -> Self {
        Self::Security {
            check,
            reason: reason.into(),
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidFormat(_) => ValidationErrorCode::InvalidFormat.http_status(),
            Self::InvalidFields { .. } => ValidationErrorCode::InvalidFields.http_status(),
            Self::Security { .. } => SecurityErrorCode::VerificationFailed.http_status(),
            Self::RateLimited { .. } => RateLimitErrorCode::Exceeded.http_status(),
            Self::Serialization(_) => 400,
            Self::Config(_) | Self::Storage(_) | Self::Delivery(_) | Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFormat(_) | Self::Serialization(_) => {
                Some(ValidationErrorCode::InvalidFormat.code())
            }
            Self::InvalidFields { .. } => Some(ValidationErrorCode::InvalidFields.code()),
            Self::Security { .. } => Some(SecurityErrorCode::VerificationFailed.code()),
            Self::RateLimited { .. } => Some(RateLimitErrorCode::Exceeded.code()),
            Self::Config(_) => Some("CONF_001"),
            Self::Storage(_) => Some("DB_001"),
            Self::Delivery(_) => Some("DELIV_001"),
            Self::Internal(_) => None,
        }
    }
}

//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use intake_core::{Error, FieldErrors, Submission};
use serde::{Deserialize, Serialize};
use telemetry::ComponentHealthReport;
use tracing::{error, warn};
use uuid::Uuid;

use crate::state::Integrations;

pub const ACCEPTED_MESSAGE: &str = "Thank you for your message! We will get back to you soon.";
pub const INVALID_FORM_MESSAGE: &str = "Invalid form data";
/// Shared by every abuse-signal rejection so clients cannot tell which check failed.
pub const VERIFICATION_FAILED_MESSAGE: &str =
    "We could not verify your submission. Please refresh the page and try again.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many submissions. Please try again later.";
pub const SERVER_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// 201 body for an accepted submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}

impl ContactResponse {
    pub fn accepted(id: Uuid) -> Self {
        Self {
            success: true,
            message: ACCEPTED_MESSAGE.to_string(),
            id,
        }
    }
}

/// `GET /api/contact` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub integrations: Integrations,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionListResponse {
    pub success: bool,
    pub count: usize,
    pub submissions: Vec<Submission>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub components: Vec<ComponentHealthReport>,
    pub queue_depth: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// API error type with gateway error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn unauthorized() -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, "AUTH_001", "Unauthorized")
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(RATE_LIMITED_MESSAGE, "RATE_001"),
            retry_after: Some(retry_after),
        }
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", "VALID_002").with_errors(errors),
            retry_after: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        // Add Retry-After header for rate limit responses
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = err.error_code().unwrap_or("INTERNAL");
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match err {
            Error::InvalidFormat(msg) => ApiError::bad_request(msg),
            Error::Serialization(e) => {
                warn!(error = %e, "Unparseable contact form body");
                ApiError::bad_request(INVALID_FORM_MESSAGE)
            }
            Error::InvalidFields { errors } => ApiError::validation(errors),
            Error::Security { check, reason } => {
                warn!(check = %check, reason = %reason, "Submission rejected");
                ApiError::with_code(status, code, VERIFICATION_FAILED_MESSAGE)
            }
            Error::RateLimited { retry_after } => ApiError::rate_limited(retry_after),
            Error::Config(ref msg)
            | Error::Storage(ref msg)
            | Error::Delivery(ref msg)
            | Error::Internal(ref msg) => {
                error!(code = code, error = %msg, "Request failed");
                ApiError::with_code(status, code, SERVER_ERROR_MESSAGE)
            }
        }
    }
}

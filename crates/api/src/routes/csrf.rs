//! CSRF token issuance.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use intake_core::Error;
use telemetry::metrics;

use crate::extractors::ClientIp;
use crate::response::{ApiError, CsrfTokenResponse};
use crate::state::AppState;

/// GET /api/csrf-token - Issue a single-use token bound to the client address.
pub async fn issue_token(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> Result<impl IntoResponse, ApiError> {
    let decision = state.token_limiter.check(&ip).await;
    if !decision.allowed {
        metrics().rate_limited.inc();
        return Err(Error::rate_limited(decision.retry_after_secs()).into());
    }

    let token = state.csrf.issue(&ip).await;
    metrics().csrf_tokens_issued.inc();

    Ok((
        [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")],
        Json(CsrfTokenResponse {
            success: true,
            token,
        }),
    ))
}

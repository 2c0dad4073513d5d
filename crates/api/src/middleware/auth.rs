//! Admin authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use constant_time_eq::constant_time_eq;
use tracing::warn;

use crate::extractors::bearer_token;
use crate::response::ApiError;
use crate::state::AppState;

/// Require `Authorization: Bearer <ADMIN_TOKEN>`.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::unauthorized());
    };

    match bearer_token(request.headers()) {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!("Admin request with wrong token");
            Err(ApiError::unauthorized())
        }
        None => {
            warn!("Admin request missing authentication");
            Err(ApiError::unauthorized())
        }
    }
}

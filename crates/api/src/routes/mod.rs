//! API routes.

pub mod admin;
pub mod contact;
pub mod csrf;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use intake_core::limits::MAX_BODY_BYTES;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::{require_admin, with_security_headers};
use crate::state::AppState;

/// Creates the API router.
///
/// The admin listing is only mounted when an admin token is configured.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route(
            "/api/contact",
            get(contact::contact_status).post(contact::submit_contact),
        )
        .route("/api/csrf-token", get(csrf::issue_token))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler));

    if state.admin_token.is_some() {
        let admin = Router::new()
            .route("/api/admin/submissions", get(admin::list_submissions))
            .route_layer(from_fn_with_state(state.clone(), require_admin));
        app = app.merge(admin);
    }

    let app = app
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    with_security_headers(app).with_state(state)
}

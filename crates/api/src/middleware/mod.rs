//! Request middleware.

pub mod auth;
pub mod security_headers;

pub use auth::require_admin;
pub use security_headers::with_security_headers;

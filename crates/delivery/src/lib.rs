//! Outbound delivery for accepted leads.
//!
//! - Automation webhook (`SubmissionForwarder`)
//! - Transactional email through Resend (`Mailer`) with the lead templates

pub mod config;
pub mod email;
pub mod templates;
pub mod webhook;

pub use config::*;
pub use email::{Mailer, OutboundEmail, ResendMailer};
pub use templates::EmailTemplates;
pub use webhook::{SubmissionForwarder, WebhookForwarder, WebhookPayload};

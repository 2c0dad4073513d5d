//! Delivery configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value sent in the `X-Source` header on webhook calls.
pub const DEFAULT_SOURCE_HEADER: &str = "Seriaflow-Website";

/// Default Resend API base URL.
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

/// Automation webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL (webhook disabled when unset)
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_source_header")]
    pub source_header: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Transactional email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Resend API key (email disabled when unset)
    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Operator inbox for new-lead notifications
    #[serde(default)]
    pub notification_email: Option<String>,
    #[serde(default = "default_from")]
    pub from: String,
    /// Send a confirmation email to the submitter
    #[serde(default = "default_true")]
    pub send_confirmation: bool,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_source_header() -> String {
    DEFAULT_SOURCE_HEADER.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_api_base() -> String {
    DEFAULT_RESEND_API_BASE.to_string()
}

fn default_from() -> String {
    "SeriaFlow <onboarding@resend.dev>".to_string()
}

fn default_true() -> bool {
    true
}

fn default_site_name() -> String {
    "SeriaFlow".to_string()
}

fn default_site_url() -> String {
    "https://seriaflow.com".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            source_header: default_source_header(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            api_base: default_api_base(),
            notification_email: None,
            from: default_from(),
            send_confirmation: default_true(),
            site_name: default_site_name(),
            site_url: default_site_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_enabled(&self) -> bool {
        self.resend_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

//! Transactional email through the Resend HTTP API.

use async_trait::async_trait;
use intake_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EmailConfig;

/// A rendered message ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Sends rendered email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ResendAccepted {
    id: Option<String>,
}

/// Resend API client (`POST {api_base}/emails`).
#[derive(Clone)]
pub struct ResendMailer {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, config: &EmailConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/emails", config.api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// Build a mailer when an API key is configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>> {
        match config.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Self::new(key, config).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Email provider request failed");
                Error::delivery(format!("Email provider unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Email provider returned error");
            return Err(Error::delivery(format!("Email provider returned {}", status)));
        }

        let accepted: ResendAccepted = response
            .json()
            .await
            .map_err(|e| Error::delivery(format!("Invalid email provider response: {}", e)))?;
        debug!(message_id = ?accepted.id, subject = %email.subject, "Email accepted");

        Ok(())
    }
}

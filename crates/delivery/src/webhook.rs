//! Automation webhook forwarding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::{ContactForm, Error, Result, Submission};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::WebhookConfig;

/// JSON body posted to the webhook: the sanitized form plus submission metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(flatten)]
    pub form: ContactForm,
    pub id: Uuid,
    pub ip: String,
    pub source: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Submission> for WebhookPayload {
    fn from(submission: &Submission) -> Self {
        Self {
            form: submission.form(),
            id: submission.id,
            ip: submission.source_ip.clone(),
            source: submission.source.clone(),
            user_agent: submission.user_agent.clone(),
            bot_score: submission.bot_score,
            submitted_at: submission.submitted_at,
        }
    }
}

/// Relays accepted submissions to downstream automation.
#[async_trait]
pub trait SubmissionForwarder: Send + Sync {
    /// Deliver one payload. Any non-2xx answer is an error.
    async fn forward(&self, payload: &WebhookPayload) -> Result<()>;
}

/// HTTP webhook forwarder.
#[derive(Clone)]
pub struct WebhookForwarder {
    http_client: reqwest::Client,
    url: String,
    source_header: String,
}

impl WebhookForwarder {
    pub fn new(url: &str, config: &WebhookConfig) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid webhook URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Webhook URL must be http(s), got {}",
                parsed.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: parsed.to_string(),
            source_header: config.source_header.clone(),
        })
    }

    /// Build a forwarder when a webhook URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>> {
        match config.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Self::new(url, config).map(Some),
            None => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubmissionForwarder for WebhookForwarder {
    async fn forward(&self, payload: &WebhookPayload) -> Result<()> {
        debug!(id = %payload.id, "Forwarding submission to webhook");

        let response = self
            .http_client
            .post(&self.url)
            .header("X-Source", &self.source_header)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Webhook request failed");
                Error::delivery(format!("Webhook unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Webhook returned error");
            return Err(Error::delivery(format!("Webhook returned {}", status)));
        }

        Ok(())
    }
}

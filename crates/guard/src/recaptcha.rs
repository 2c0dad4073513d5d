//! Bot-score verification against the reCAPTCHA v3 site-verify API.
//!
//! Every failure mode (network error, non-200, unparseable body, low score)
//! produces a failed verdict. Nothing here returns an error to the caller
//! once the verifier is built.

use async_trait::async_trait;
use intake_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RecaptchaConfig;

/// Outcome of a bot-score check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotVerdict {
    pub passed: bool,
    /// Score reported by the provider, when one was returned.
    pub score: Option<f64>,
}

impl BotVerdict {
    pub fn pass(score: f64) -> Self {
        Self {
            passed: true,
            score: Some(score),
        }
    }

    pub fn fail(score: Option<f64>) -> Self {
        Self {
            passed: false,
            score,
        }
    }
}

/// Scores a client-supplied verification token.
#[async_trait]
pub trait BotScorer: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> BotVerdict;
}

/// Body returned by the site-verify endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}

/// Apply the pass rule: `success` and a score at or above `threshold`.
pub fn evaluate(response: &SiteVerifyResponse, threshold: f64) -> BotVerdict {
    match (response.success, response.score) {
        (true, Some(score)) if score >= threshold => BotVerdict::pass(score),
        (_, score) => BotVerdict::fail(score),
    }
}

/// HTTP client for Google's site-verify endpoint.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    http_client: reqwest::Client,
    verify_url: String,
    secret: String,
    threshold: f64,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>, config: &RecaptchaConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            verify_url: config.verify_url.clone(),
            secret: secret.into(),
            threshold: config.threshold,
        })
    }

    /// Build a verifier from config, if a secret key is configured.
    pub fn from_config(config: &RecaptchaConfig) -> Result<Option<Self>> {
        match config.secret_key.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret, config).map(Some),
            None => Ok(None),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn site_verify(&self, token: &str, remote_ip: Option<&str>) -> Option<SiteVerifyResponse> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = match self.http_client.post(&self.verify_url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "reCAPTCHA request failed");
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), "reCAPTCHA returned non-200");
            return None;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "Failed to parse reCAPTCHA response");
                None
            }
        }
    }
}

#[async_trait]
impl BotScorer for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> BotVerdict {
        let Some(body) = self.site_verify(token, remote_ip).await else {
            return BotVerdict::fail(None);
        };

        let verdict = evaluate(&body, self.threshold);
        if verdict.passed {
            debug!(score = ?verdict.score, "reCAPTCHA passed");
        } else {
            debug!(
                success = body.success,
                score = ?body.score,
                errors = ?body.error_codes,
                "reCAPTCHA rejected"
            );
        }
        verdict
    }
}

//! Contact form and submission record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::limits::{MAX_IP_LEN, MAX_SOURCE_LEN, MAX_USER_AGENT_LEN};

/// Default source tag when the client does not send one.
pub const DEFAULT_SOURCE: &str = "website";

/// Raw contact form body as posted by the site.
///
/// Every field is optional at this stage so that missing values surface
/// as per-field validation messages instead of a parse failure. Both the
/// contact page (`email`, `company`) and the landing page (`whatsapp`,
/// `business`, snake_case token fields) post to the same endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// WhatsApp number, collected by the landing-page variant of the form.
    pub whatsapp: Option<String>,
    #[serde(alias = "business")]
    pub company: Option<String>,
    pub message: Option<String>,
    /// Display text of the selected country code
    pub country: Option<String>,
    /// Selected challenge key
    pub challenge: Option<String>,
    #[serde(alias = "challenge_label")]
    pub challenge_label: Option<String>,
    /// reCAPTCHA v3 token
    #[serde(alias = "recaptcha_token")]
    pub recaptcha_token: Option<String>,
    /// Bare reCAPTCHA token; the landing form sends it next to `recaptcha_token`.
    pub token: Option<String>,
    #[serde(alias = "csrf_token")]
    pub csrf_token: Option<String>,
    /// Which page or campaign produced the lead
    pub source: Option<String>,
}

impl ContactRequest {
    /// The first non-empty bot-check token, `recaptchaToken` before `token`.
    pub fn bot_token(&self) -> Option<&str> {
        [&self.recaptcha_token, &self.token]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }
}

/// Validated and HTML-escaped contact fields.
///
/// At least one of `email` and `whatsapp` is present. `company` is empty
/// when the client did not send one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub company: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_label: Option<String>,
}

/// Request metadata captured alongside a submission.
#[derive(Debug, Clone, Default)]
pub struct SubmissionMeta {
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub source: Option<String>,
    pub bot_score: Option<f64>,
}

/// An accepted lead. Append-only: created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub company: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_label: Option<String>,
    pub source: String,
    pub source_ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Creates a new submission with a fresh id and the current timestamp.
    pub fn new(form: ContactForm, meta: SubmissionMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: form.name,
            email: form.email,
            company: form.company,
            message: form.message,
            whatsapp: form.whatsapp,
            country: form.country,
            challenge: form.challenge,
            challenge_label: form.challenge_label,
            source: normalize_source(meta.source.as_deref()),
            source_ip: truncate_chars(&meta.source_ip, MAX_IP_LEN),
            user_agent: meta
                .user_agent
                .map(|ua| truncate_chars(&ua, MAX_USER_AGENT_LEN))
                .unwrap_or_default(),
            bot_score: meta.bot_score,
            submitted_at: Utc::now(),
        }
    }

    /// Returns the validated form fields of this submission.
    pub fn form(&self) -> ContactForm {
        ContactForm {
            name: self.name.clone(),
            email: self.email.clone(),
            company: self.company.clone(),
            message: self.message.clone(),
            whatsapp: self.whatsapp.clone(),
            country: self.country.clone(),
            challenge: self.challenge.clone(),
            challenge_label: self.challenge_label.clone(),
        }
    }
}

/// Accepts short slug-like source tags; anything else falls back to the default.
fn normalize_source(source: Option<&str>) -> String {
    match source.map(str::trim) {
        Some(s)
            if !s.is_empty()
                && s.len() <= MAX_SOURCE_LEN
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            s.to_ascii_lowercase()
        }
        _ => DEFAULT_SOURCE.to_string(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

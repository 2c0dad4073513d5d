//! Test fixtures and payload builders.

use serde_json::{json, Value};

/// Token the mock scorer accepts; its score comes from the scorer itself.
pub const RECAPTCHA_TOKEN: &str = "test-recaptcha-token";

/// The reference lead, carrying the given CSRF token.
pub fn contact_payload(csrf_token: &str) -> Value {
    json!({
        "name": "John Doe",
        "email": "john@example.com",
        "company": "Test Co",
        "message": "This is a test message that is long enough",
        "recaptchaToken": RECAPTCHA_TOKEN,
        "csrfToken": csrf_token,
    })
}

/// Reference lead without a CSRF token.
pub fn contact_payload_without_csrf() -> Value {
    let mut payload = contact_payload("");
    if let Some(obj) = payload.as_object_mut() {
        obj.remove("csrfToken");
    }
    payload
}

/// Reference lead with one field replaced.
pub fn contact_payload_with(csrf_token: &str, field: &str, value: Value) -> Value {
    let mut payload = contact_payload(csrf_token);
    payload[field] = value;
    payload
}

/// Lead as posted by the landing page: WhatsApp instead of email,
/// `business` instead of company, snake_case token fields.
pub fn landing_payload(csrf_token: &str) -> Value {
    json!({
        "name": "Budi Santoso",
        "business": "Toko Budi",
        "whatsapp": "6281234567890",
        "country": "Indonesia (+62)",
        "challenge": "slow_response",
        "challenge_label": "Slow customer response",
        "message": "We need help answering customers faster",
        "source": "website",
        "submitted_at": "2026-10-19T08:00:00.000Z",
        "recaptcha_token": RECAPTCHA_TOKEN,
        "token": RECAPTCHA_TOKEN,
        "csrf_token": csrf_token,
    })
}

//! Tests for contact pipeline rejections.
//!
//! These verify status codes, error codes and messages for every step that
//! can refuse a submission, and that refused leads are never stored.

use api::response::{INVALID_FORM_MESSAGE, SERVER_ERROR_MESSAGE, VERIFICATION_FAILED_MESSAGE};
use axum::http::StatusCode;
use bytes::Bytes;
use integration_tests::{
    fixtures,
    setup::{fetch_csrf_token, TestContext, TestOptions},
};
use serde_json::{json, Value};

/// Malformed JSON is rejected as invalid form data.
#[tokio::test]
async fn test_invalid_json_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/contact")
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{not json"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(body["error"], INVALID_FORM_MESSAGE);
}

/// A non-string field value is treated like malformed JSON.
#[tokio::test]
async fn test_non_string_field_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let payload = fixtures::contact_payload_with(&token, "name", json!(12345));
    let response = server.post("/api/contact").json(&payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], INVALID_FORM_MESSAGE);
}

/// Bodies over the size limit never reach the handler.
#[tokio::test]
async fn test_oversized_body_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/contact")
        .content_type("application/json")
        .bytes(Bytes::from(vec![b'a'; 20 * 1024]))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert!(ctx.store.saved().is_empty());
}

/// A missing reCAPTCHA token is a client error, checked before scoring.
#[tokio::test]
async fn test_missing_recaptcha_token_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let mut payload = fixtures::contact_payload(&token);
    payload.as_object_mut().unwrap().remove("recaptchaToken");

    let response = server.post("/api/contact").json(&payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(body["error"], "reCAPTCHA verification required");
    assert!(ctx.scorer.calls().is_empty());
}

/// Every failing field is reported at once.
#[tokio::test]
async fn test_field_errors_reported() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let mut payload = fixtures::contact_payload(&token);
    payload["name"] = json!("J");
    payload["email"] = json!("not-an-email");
    payload["message"] = json!("Too short");

    let response = server.post("/api/contact").json(&payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_002");
    assert_eq!(body["errors"]["name"], "Name must be at least 2 characters");
    assert_eq!(body["errors"]["email"], "Invalid email format");
    assert_eq!(
        body["errors"]["message"],
        "Message must be at least 10 characters"
    );
    assert!(body["errors"].get("company").is_none());
    assert!(ctx.store.saved().is_empty());
}

/// A lead needs an email or a WhatsApp number; one message covers both.
#[tokio::test]
async fn test_contact_channel_required() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let mut payload = fixtures::contact_payload(&token);
    payload.as_object_mut().unwrap().remove("email");
    payload["whatsapp"] = json!("   ");

    let response = server.post("/api/contact").json(&payload).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_002");
    assert_eq!(body["errors"]["email"], "Email or WhatsApp is required");
    assert!(body["errors"].get("whatsapp").is_none());
    assert!(ctx.store.saved().is_empty());
}

/// Script injection is refused with the field's invalid-characters message.
#[tokio::test]
async fn test_injection_patterns_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let cases = [
        ("message", "Hello <script>alert(1)</script> there", "Message"),
        ("company", "Acme; DROP TABLE contacts", "Company"),
        ("name", "John onload=run()", "Name"),
    ];

    for (field, value, label) in cases {
        let token = fetch_csrf_token(&server).await;
        let payload = fixtures::contact_payload_with(&token, field, json!(value));
        let response = server.post("/api/contact").json(&payload).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            body["errors"][field],
            format!("{} contains invalid characters", label),
            "Field {} should be rejected",
            field
        );
    }
    assert!(ctx.store.saved().is_empty());
}

/// Missing CSRF token is refused with the generic verification message.
#[tokio::test]
async fn test_missing_csrf_token_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload_without_csrf())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "SEC_001");
    assert_eq!(body["error"], VERIFICATION_FAILED_MESSAGE);
}

/// A forged CSRF token is refused before the bot check runs.
#[tokio::test]
async fn test_unknown_csrf_token_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(
            "0123456789abcdef0123456789abcdef",
        ))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert!(ctx.scorer.calls().is_empty(), "Bot check must not run");
}

/// CSRF tokens are single-use.
#[tokio::test]
async fn test_csrf_token_reuse_rejected() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "SEC_001");
    assert_eq!(ctx.store.saved().len(), 1);
}

/// A low bot score is indistinguishable from a CSRF failure.
#[tokio::test]
async fn test_low_bot_score_rejected() {
    let ctx = TestContext::with_options(TestOptions {
        score: Some(0.3),
        ..Default::default()
    });
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let bot_response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;
    bot_response.assert_status(StatusCode::FORBIDDEN);

    let csrf_response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload_without_csrf())
        .await;
    csrf_response.assert_status(StatusCode::FORBIDDEN);

    let bot_body: Value = bot_response.json();
    let csrf_body: Value = csrf_response.json();
    assert_eq!(bot_body, csrf_body);
    assert!(ctx.store.saved().is_empty());
}

/// The threshold is inclusive.
#[tokio::test]
async fn test_score_at_threshold_accepted() {
    let ctx = TestContext::with_options(TestOptions {
        score: Some(0.5),
        ..Default::default()
    });
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Without a verifier secret, submissions are refused as a server error.
#[tokio::test]
async fn test_missing_recaptcha_secret_is_server_error() {
    let ctx = TestContext::with_options(TestOptions {
        score: None,
        ..Default::default()
    });
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONF_001");
    assert_eq!(body["error"], SERVER_ERROR_MESSAGE);
}

/// With neither store nor webhook, nothing durable can accept the lead.
#[tokio::test]
async fn test_no_durable_channel_is_server_error() {
    let ctx = TestContext::with_options(TestOptions {
        store: false,
        webhook: false,
        ..Default::default()
    });
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONF_001");
}

/// A store failure is reported without leaking details.
#[tokio::test]
async fn test_store_failure_is_server_error() {
    let ctx = TestContext::new();
    ctx.store.set_should_fail(true);
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001");
    assert_eq!(body["error"], SERVER_ERROR_MESSAGE);

    // Nothing was queued for delivery
    assert!(events.try_recv().is_err());
    assert!(ctx.forwarder.payloads().is_empty());
}

/// When the webhook is the durable step, its failure fails the request.
#[tokio::test]
async fn test_inline_webhook_failure_is_server_error() {
    let ctx = TestContext::with_options(TestOptions {
        store: false,
        ..Default::default()
    });
    ctx.forwarder.set_should_fail(true);
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DELIV_001");
}

/// Rejected requests still count against the rate limit.
#[tokio::test]
async fn test_rejected_requests_consume_rate_limit() {
    let ctx = TestContext::with_options(TestOptions {
        max_requests: 2,
        ..Default::default()
    });
    let server = ctx.server();

    for _ in 0..2 {
        server
            .post("/api/contact")
            .content_type("application/json")
            .bytes(Bytes::from_static(b"{not json"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

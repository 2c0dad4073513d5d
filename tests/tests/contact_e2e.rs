//! End-to-end tests for the contact pipeline.
//!
//! POST /api/contact → guards → store → dispatcher → webhook and email mocks.
//! The mocks implement the production traits, so everything except the
//! outbound network transport runs through production code.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use integration_tests::{
    fixtures,
    setup::{fetch_csrf_token, TestContext, TestOptions, ADMIN_TOKEN, OPERATOR_EMAIL},
};
use worker::{DeliveryChannel, DeliveryOutcome};

fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

/// Valid lead with score 0.9 and a fresh CSRF token is accepted.
#[tokio::test]
async fn test_valid_submission_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["id"].as_str().is_some(), "Response should carry an id");

    let saved = ctx.store.saved();
    assert_eq!(saved.len(), 1, "Store should hold the accepted lead");
    assert_eq!(saved[0].id.to_string(), body["id"].as_str().unwrap());
    assert_eq!(saved[0].name, "John Doe");
    assert_eq!(saved[0].email.as_deref(), Some("john@example.com"));
    assert_eq!(saved[0].bot_score, Some(0.9));
}

/// Six identical POSTs from one client: 201 five times, then 429.
#[tokio::test]
async fn test_sixth_submission_rate_limited() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let (name, value) = forwarded_for("203.0.113.10");

    for attempt in 1..=5 {
        let token = fetch_csrf_token(&server).await;
        let response = server
            .post("/api/contact")
            .add_header(name.clone(), value.clone())
            .json(&fixtures::contact_payload(&token))
            .await;
        assert_eq!(
            response.status_code(),
            StatusCode::CREATED,
            "Attempt {} should be accepted",
            attempt
        );
    }

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .add_header(name.clone(), value.clone())
        .json(&fixtures::contact_payload(&token))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RATE_001");

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .expect("429 should carry Retry-After")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 600);

    assert_eq!(ctx.store.saved().len(), 5);

    // A different client is unaffected
    let (name, value) = forwarded_for("198.51.100.20");
    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .add_header(name, value)
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);
}

/// The resolved client address feeds the scorer and the stored record.
#[tokio::test]
async fn test_client_address_recorded() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let (name, value) = forwarded_for("203.0.113.7, 10.0.0.1");

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .add_header(name, value)
        .add_header(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (Test)"))
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let calls = ctx.scorer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, fixtures::RECAPTCHA_TOKEN);
    assert_eq!(calls[0].1.as_deref(), Some("203.0.113.7"));

    let saved = ctx.store.saved();
    assert_eq!(saved[0].source_ip, "203.0.113.7");
    assert_eq!(saved[0].user_agent, "Mozilla/5.0 (Test)");
}

/// Stored text is HTML-escaped and trimmed.
#[tokio::test]
async fn test_fields_sanitized_before_storage() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let payload = fixtures::contact_payload_with(
        &token,
        "company",
        serde_json::json!("  Smith & \"Sons\"  "),
    );
    server
        .post("/api/contact")
        .json(&payload)
        .await
        .assert_status(StatusCode::CREATED);

    let saved = ctx.store.saved();
    assert_eq!(saved[0].company, "Smith &amp; &quot;Sons&quot;");
}

/// A landing-page lead with WhatsApp and no email is stored and forwarded
/// with its context fields; only the operator email goes out.
#[tokio::test]
async fn test_whatsapp_only_landing_lead() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::landing_payload(&token))
        .await;
    response.assert_status(StatusCode::CREATED);

    let saved = ctx.store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].email, None);
    assert_eq!(saved[0].whatsapp.as_deref(), Some("6281234567890"));
    assert_eq!(saved[0].company, "Toko Budi");
    assert_eq!(saved[0].challenge.as_deref(), Some("slow_response"));
    assert_eq!(
        saved[0].challenge_label.as_deref(),
        Some("Slow customer response")
    );

    let events = TestContext::collect_events(&mut events, 3).await;
    let confirmation = events
        .iter()
        .find(|e| e.channel == DeliveryChannel::ConfirmationEmail)
        .unwrap();
    assert_eq!(
        confirmation.outcome,
        DeliveryOutcome::Skipped("no email address".into())
    );

    let payloads = ctx.forwarder.payloads();
    assert_eq!(payloads.len(), 1);
    let forwarded = serde_json::to_value(&payloads[0]).unwrap();
    assert!(forwarded.get("email").is_none());
    assert_eq!(forwarded["whatsapp"], "6281234567890");
    assert_eq!(forwarded["country"], "Indonesia (+62)");
    assert_eq!(forwarded["challenge_label"], "Slow customer response");

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![OPERATOR_EMAIL.to_string()]);
    assert_eq!(sent[0].reply_to, None);
}

/// The CSRF token may arrive in the X-CSRF-Token header instead of the body.
#[tokio::test]
async fn test_csrf_token_from_header() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .add_header(
            HeaderName::from_static("x-csrf-token"),
            HeaderValue::from_str(&token).unwrap(),
        )
        .json(&fixtures::contact_payload_without_csrf())
        .await
        .assert_status(StatusCode::CREATED);

    // Consumed through the header like any other token
    let response = server
        .post("/api/contact")
        .add_header(
            HeaderName::from_static("x-csrf-token"),
            HeaderValue::from_str(&token).unwrap(),
        )
        .json(&fixtures::contact_payload_without_csrf())
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.saved().len(), 1);
}

/// snake_case token fields from the landing script are accepted.
#[tokio::test]
async fn test_snake_case_token_fields_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let token = fetch_csrf_token(&server).await;
    let mut payload = fixtures::contact_payload_without_csrf();
    let obj = payload.as_object_mut().unwrap();
    let recaptcha = obj.remove("recaptchaToken").unwrap();
    obj.insert("recaptcha_token".into(), recaptcha);
    obj.insert("csrf_token".into(), serde_json::json!(token));

    server
        .post("/api/contact")
        .json(&payload)
        .await
        .assert_status(StatusCode::CREATED);

    let calls = ctx.scorer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, fixtures::RECAPTCHA_TOKEN);
}

/// After the store accepts a lead, webhook and both emails run in the background.
#[tokio::test]
async fn test_background_delivery_events() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    let response = server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let id = body["id"].as_str().unwrap().to_string();

    let events = TestContext::collect_events(&mut events, 3).await;
    assert!(events.iter().all(|e| e.submission_id.to_string() == id));
    assert!(
        events.iter().all(|e| e.outcome.is_delivered()),
        "All channels should deliver: {:?}",
        events
    );

    let payloads = ctx.forwarder.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].id.to_string(), id);
    assert_eq!(payloads[0].form.name, "John Doe");

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.to == vec![OPERATOR_EMAIL.to_string()]));
    assert!(sent
        .iter()
        .any(|m| m.to == vec!["john@example.com".to_string()]));
}

/// Email failures are reported as events but never change the 201.
#[tokio::test]
async fn test_email_failure_does_not_fail_submission() {
    let ctx = TestContext::new();
    ctx.mailer.set_should_fail(true);
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let events = TestContext::collect_events(&mut events, 3).await;
    for event in &events {
        match event.channel {
            DeliveryChannel::Webhook => assert_eq!(event.outcome, DeliveryOutcome::Delivered),
            DeliveryChannel::OperatorEmail | DeliveryChannel::ConfirmationEmail => {
                assert!(matches!(event.outcome, DeliveryOutcome::Failed(_)))
            }
        }
    }
    assert_eq!(ctx.store.saved().len(), 1);
}

/// Background webhook failure leaves the stored lead accepted.
#[tokio::test]
async fn test_background_webhook_failure_does_not_fail_submission() {
    let ctx = TestContext::new();
    ctx.forwarder.set_should_fail(true);
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let events = TestContext::collect_events(&mut events, 3).await;
    let webhook = events
        .iter()
        .find(|e| e.channel == DeliveryChannel::Webhook)
        .unwrap();
    assert!(matches!(webhook.outcome, DeliveryOutcome::Failed(_)));
}

/// Without a store the webhook is the durable step and runs before the 201.
#[tokio::test]
async fn test_webhook_only_delivers_inline() {
    let ctx = TestContext::with_options(TestOptions {
        store: false,
        ..Default::default()
    });
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    // Already delivered when the response arrives
    assert_eq!(ctx.forwarder.payloads().len(), 1);

    let events = TestContext::collect_events(&mut events, 3).await;
    let webhook = events
        .iter()
        .find(|e| e.channel == DeliveryChannel::Webhook)
        .unwrap();
    assert!(matches!(webhook.outcome, DeliveryOutcome::Skipped(_)));
    assert_eq!(ctx.forwarder.payloads().len(), 1, "Webhook must not run twice");
}

/// Email channels are skipped when no mailer is configured.
#[tokio::test]
async fn test_email_skipped_without_mailer() {
    let ctx = TestContext::with_options(TestOptions {
        email: false,
        ..Default::default()
    });
    let server = ctx.server();
    let mut events = ctx.dispatcher.subscribe();

    let token = fetch_csrf_token(&server).await;
    server
        .post("/api/contact")
        .json(&fixtures::contact_payload(&token))
        .await
        .assert_status(StatusCode::CREATED);

    let events = TestContext::collect_events(&mut events, 3).await;
    let skipped = events
        .iter()
        .filter(|e| matches!(e.outcome, DeliveryOutcome::Skipped(_)))
        .count();
    assert_eq!(skipped, 2);
    assert!(ctx.mailer.sent().is_empty());
}

/// The admin listing returns stored leads, newest first.
#[tokio::test]
async fn test_admin_lists_recent_submissions() {
    let ctx = TestContext::with_options(TestOptions {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..Default::default()
    });
    let server = ctx.server();

    for name in ["First Lead", "Second Lead"] {
        let token = fetch_csrf_token(&server).await;
        let payload = fixtures::contact_payload_with(&token, "name", serde_json::json!(name));
        server
            .post("/api/contact")
            .json(&payload)
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .get("/api/admin/submissions")
        .add_query_param("limit", 10)
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", ADMIN_TOKEN)).unwrap(),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["submissions"][0]["name"], "Second Lead");
    assert_eq!(body["submissions"][1]["name"], "First Lead");
}

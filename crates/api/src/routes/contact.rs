//! Contact form endpoint.
//!
//! Each submission runs: rate limit, body parse, CSRF check, bot score,
//! field validation, durable step (store or inline webhook), then background
//! delivery. The first failing step decides the response.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use delivery::WebhookPayload;
use intake_core::{
    error::SecurityCheck, validate_contact_form, ContactRequest, Error, Result, Submission,
    SubmissionMeta,
};
use std::time::Instant;
use telemetry::{health, metrics};
use tracing::{debug, info};
use worker::DeliveryJob;

use crate::extractors::{ClientIp, CsrfHeader, UserAgent};
use crate::response::{ApiError, ContactResponse, StatusResponse, INVALID_FORM_MESSAGE};
use crate::state::AppState;

/// POST /api/contact - Accept a lead.
pub async fn submit_contact(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    CsrfHeader(csrf_header): CsrfHeader,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<ContactResponse>), ApiError> {
    let start = Instant::now();
    metrics().submissions_received.inc();

    let decision = state.rate_limiter.check(&ip).await;
    if !decision.allowed {
        metrics().rate_limited.inc();
        return Err(Error::rate_limited(decision.retry_after_secs()).into());
    }

    let request = parse_body(&body)?;

    // Body token first, then the header
    let csrf_token = request
        .csrf_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(csrf_header.as_deref());
    verify_csrf(&state, csrf_token).await?;

    let bot_score = verify_bot_score(&state, request.bot_token(), &ip).await?;

    let form = validate_contact_form(&request).into_result().inspect_err(|_| {
        metrics().validation_failed.inc();
    })?;

    let submission = Submission::new(
        form,
        SubmissionMeta {
            source_ip: ip,
            user_agent,
            source: request.source,
            bot_score,
        },
    );

    let forward_webhook = persist(&state, &submission).await?;

    // The lead is durable at this point; queueing problems are logged only.
    let _ = state.dispatcher.enqueue(DeliveryJob {
        submission: submission.clone(),
        forward_webhook,
    });

    metrics().submissions_accepted.inc();
    metrics()
        .intake_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    info!(
        id = %submission.id,
        source = %submission.source,
        bot_score = ?submission.bot_score,
        "Lead accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse::accepted(submission.id)),
    ))
}

/// GET /api/contact - Liveness plus configured integrations.
pub async fn contact_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "Contact API is running".to_string(),
        integrations: state.integrations(),
    })
}

fn parse_body(body: &[u8]) -> Result<ContactRequest> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejected contact form body");
        Error::invalid_format(INVALID_FORM_MESSAGE)
    })
}

async fn verify_csrf(state: &AppState, token: Option<&str>) -> Result<()> {
    let outcome = match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            if state.csrf.verify(token).await {
                Ok(())
            } else {
                Err(Error::security(
                    SecurityCheck::Csrf,
                    "invalid, expired or reused token",
                ))
            }
        }
        None if state.csrf_required => Err(Error::security(SecurityCheck::Csrf, "missing token")),
        None => Ok(()),
    };

    if outcome.is_err() {
        metrics().csrf_rejected.inc();
    }
    outcome
}

async fn verify_bot_score(state: &AppState, token: Option<&str>, ip: &str) -> Result<Option<f64>> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Err(Error::invalid_format("reCAPTCHA verification required"));
    };

    let Some(scorer) = &state.scorer else {
        return Err(Error::config("RECAPTCHA_SECRET_KEY is not configured"));
    };

    let start = Instant::now();
    let verdict = scorer.verify(token, Some(ip)).await;
    metrics()
        .recaptcha_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    if !verdict.passed {
        metrics().bot_rejected.inc();
        return Err(Error::security(
            SecurityCheck::BotScore,
            format!("score {:?} below threshold or verification failed", verdict.score),
        ));
    }

    Ok(verdict.score)
}

/// Run the durable step. Returns whether the webhook still needs to run in
/// the background.
async fn persist(state: &AppState, submission: &Submission) -> Result<bool> {
    if let Some(store) = &state.store {
        store.save(submission).await.inspect_err(|e| {
            metrics().store_errors.inc();
            health().database.set_unhealthy(e.to_string());
        })?;
        return Ok(true);
    }

    if let Some(forwarder) = &state.forwarder {
        forwarder
            .forward(&WebhookPayload::from(submission))
            .await
            .inspect_err(|e| {
                metrics().webhook_failed.inc();
                health().webhook.set_unhealthy(e.to_string());
            })?;
        metrics().webhook_delivered.inc();
        health().webhook.set_healthy();
        return Ok(false);
    }

    Err(Error::config(
        "no durable channel: configure a submission store or a webhook URL",
    ))
}

//! Seriaflow Lead Gateway
//!
//! Public intake for the marketing site's contact form:
//! - Per-client rate limiting, CSRF tokens and reCAPTCHA v3 scoring
//! - Field validation and sanitization
//! - Durable store or inline webhook, then background webhook and email delivery
//! - Background workers for token sweeps, rate-limit snapshots and health

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use delivery::{
    DeliveryConfig, EmailTemplates, Mailer, ResendMailer, SubmissionForwarder, WebhookForwarder,
};
use guard::{BotScorer, CsrfGuard, GuardConfig, RateLimiter, RecaptchaVerifier};
use storage::{build_store, StorageBackend, StorageConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{DeliveryChannels, Dispatcher, DispatcherConfig, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Bearer token for the admin listing (listing disabled when unset)
    #[serde(default)]
    admin_token: Option<String>,

    #[serde(default)]
    guard: GuardConfig,

    #[serde(default)]
    delivery: DeliveryConfig,

    #[serde(default)]
    storage: StorageConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: None,
            guard: GuardConfig::default(),
            delivery: DeliveryConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Lead Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // Guards
    let rate_limiter = Arc::new(RateLimiter::new(&config.guard.rate_limit));
    if let Err(e) = rate_limiter.restore_snapshot().await {
        warn!(error = %e, "Could not restore rate limit snapshot, starting empty");
    }
    let token_limiter = Arc::new(RateLimiter::new(&config.guard.token_rate_limit));

    let csrf = Arc::new(CsrfGuard::new(&config.guard.csrf));

    let scorer = RecaptchaVerifier::from_config(&config.guard.recaptcha)
        .context("Failed to build reCAPTCHA verifier")?;
    if scorer.is_none() {
        warn!("RECAPTCHA_SECRET_KEY is not set, submissions will be refused");
    }

    // Delivery channels
    let store = build_store(&config.storage)
        .await
        .context("Failed to initialize submission store")?;

    let forwarder: Option<Arc<dyn SubmissionForwarder>> =
        WebhookForwarder::from_config(&config.delivery.webhook)
            .context("Failed to build webhook forwarder")?
            .map(|f| Arc::new(f) as Arc<dyn SubmissionForwarder>);

    let mailer: Option<Arc<dyn Mailer>> = ResendMailer::from_config(&config.delivery.email)
        .context("Failed to build mailer")?
        .map(|m| Arc::new(m) as Arc<dyn Mailer>);

    if store.is_none() && forwarder.is_none() {
        warn!("Neither a submission store nor a webhook is configured, submissions will be refused");
    }

    init_health(store.is_some(), forwarder.is_some(), mailer.is_some());

    // Background delivery
    let (dispatcher, dispatcher_task) = Dispatcher::spawn(
        DispatcherConfig::default(),
        DeliveryChannels {
            forwarder: forwarder.clone(),
            mailer: mailer.clone(),
            templates: EmailTemplates::new(&config.delivery.email),
        },
    );

    // Maintenance workers
    let scheduler = Arc::new(
        WorkerScheduler::new(
            WorkerConfig::default(),
            rate_limiter.clone(),
            csrf.clone(),
            store.clone(),
        )
        .with_token_limiter(token_limiter.clone()),
    );
    scheduler.check_store_health().await;
    let worker_handles = scheduler.clone().start();

    // Create application state
    let mut state = AppState::new(rate_limiter.clone(), csrf, dispatcher.clone())
        .with_token_limiter(token_limiter)
        .with_csrf_required(config.guard.csrf.required)
        .with_email(mailer.is_some());
    if let Some(scorer) = scorer {
        state = state.with_scorer(Arc::new(scorer) as Arc<dyn BotScorer>);
    }
    if let Some(store) = store {
        state = state.with_store(store);
    }
    if let Some(forwarder) = forwarder {
        state = state.with_forwarder(forwarder);
    }
    if let Some(token) = config.admin_token.clone().filter(|t| !t.is_empty()) {
        state = state.with_admin_token(token);
    }

    info!(integrations = ?state.integrations(), "Integrations configured");

    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Peer addresses feed the client IP fallback
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down...");

    // Finish queued deliveries before exiting
    dispatcher.shutdown().await;
    if let Err(e) = dispatcher_task.await {
        error!("Dispatcher task failed: {}", e);
    }

    for handle in worker_handles {
        handle.abort();
    }

    match rate_limiter.save_snapshot().await {
        Ok(0) => {}
        Ok(saved) => info!(saved, "Flushed rate limit snapshot"),
        Err(e) => error!("Failed to flush rate limit snapshot: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("LEADGATE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Apply the conventional deployment variable names on top of the layered
/// configuration. `env` looks a variable up by name.
fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(secret) = env("RECAPTCHA_SECRET_KEY") {
        config.guard.recaptcha.secret_key = Some(secret);
    }
    if let Some(secret) = env("CSRF_SECRET") {
        config.guard.csrf.secret = secret;
    }
    if let Some(max) = env("RATE_LIMIT_MAX") {
        config.guard.rate_limit.max_requests = max
            .parse()
            .with_context(|| format!("Invalid RATE_LIMIT_MAX: {}", max))?;
    }
    if let Some(window) = env("RATE_LIMIT_WINDOW") {
        config.guard.rate_limit.window_ms = window
            .parse()
            .with_context(|| format!("Invalid RATE_LIMIT_WINDOW: {}", window))?;
    }

    // n8n deployments, the generic name, then the landing-site name
    if let Some(url) = ["N8N_WEBHOOK_URL", "WEBHOOK_URL", "PUBLIC_WEBHOOK_URL"]
        .into_iter()
        .find_map(|key| env(key).filter(|v| !v.is_empty()))
    {
        config.delivery.webhook.url = Some(url);
    }
    if let Some(key) = env("RESEND_API_KEY") {
        config.delivery.email.resend_api_key = Some(key);
    }
    if let Some(email) = env("NOTIFICATION_EMAIL") {
        config.delivery.email.notification_email = Some(email);
    }
    if let Some(from) = env("EMAIL_FROM") {
        config.delivery.email.from = from;
    }

    if let Some(url) = env("CLICKHOUSE_URL") {
        config.storage.clickhouse.url = url;
        config.storage.backend = StorageBackend::ClickHouse;
    }
    if let Some(username) = env("CLICKHOUSE_USERNAME") {
        config.storage.clickhouse.username = Some(username);
    }
    if let Some(password) = env("CLICKHOUSE_PASSWORD") {
        config.storage.clickhouse.password = Some(password);
    }

    if let Some(token) = env("ADMIN_TOKEN") {
        config.admin_token = Some(token);
    }
    if let Some(port) = env("PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("Invalid PORT: {}", port))?;
    }

    Ok(())
}

/// Mark configured channels as enabled. Outbound channels start healthy and
/// are updated by delivery outcomes; the store is probed by the scheduler.
fn init_health(store: bool, webhook: bool, email: bool) {
    health().database.set_enabled(store);
    health().webhook.set_enabled(webhook);
    health().email.set_enabled(email);

    if webhook {
        health().webhook.set_healthy();
    }
    if email {
        health().email.set_healthy();
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}

//! Periodic maintenance tasks.

use guard::{CsrfGuard, SharedRateLimiter};
use std::sync::Arc;
use std::time::Duration;
use storage::SubmissionStore;
use telemetry::{health, metrics};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Maintenance scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Expired CSRF token sweep interval
    pub csrf_sweep_interval: Duration,
    /// Stale rate-limit window cleanup interval
    pub rate_limit_cleanup_interval: Duration,
    /// Rate-limit snapshot interval (only when a snapshot file is configured)
    pub snapshot_interval: Duration,
    /// Metrics log interval
    pub metrics_log_interval: Duration,
    /// Store health probe interval
    pub health_check_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            csrf_sweep_interval: Duration::from_secs(300),        // 5 minutes
            rate_limit_cleanup_interval: Duration::from_secs(300), // 5 minutes
            snapshot_interval: Duration::from_secs(60),           // 1 minute
            metrics_log_interval: Duration::from_secs(60),        // 1 minute
            health_check_interval: Duration::from_secs(30),
        }
    }
}

/// Background maintenance scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    rate_limiter: SharedRateLimiter,
    token_limiter: Option<SharedRateLimiter>,
    csrf: Arc<CsrfGuard>,
    store: Option<Arc<dyn SubmissionStore>>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        rate_limiter: SharedRateLimiter,
        csrf: Arc<CsrfGuard>,
        store: Option<Arc<dyn SubmissionStore>>,
    ) -> Self {
        Self {
            config,
            rate_limiter,
            token_limiter: None,
            csrf,
            store,
        }
    }

    /// Also clean up the CSRF issuance limiter.
    pub fn with_token_limiter(mut self, limiter: SharedRateLimiter) -> Self {
        self.token_limiter = Some(limiter);
        self
    }

    /// Starts all maintenance loops.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_every(scheduler.config.csrf_sweep_interval, |s| async move {
                s.sweep_csrf().await;
            })
            .await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler
                .run_every(scheduler.config.rate_limit_cleanup_interval, |s| async move {
                    s.cleanup_rate_limits().await;
                })
                .await;
        }));

        if self.rate_limiter.has_snapshot() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler
                    .run_every(scheduler.config.snapshot_interval, |s| async move {
                        s.save_snapshot().await;
                    })
                    .await;
            }));
        }

        if self.store.is_some() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler
                    .run_every(scheduler.config.health_check_interval, |s| async move {
                        s.check_store_health().await;
                    })
                    .await;
            }));
        }

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler
                .run_every(scheduler.config.metrics_log_interval, |s| async move {
                    s.log_metrics().await;
                })
                .await;
        }));

        info!(tasks = handles.len(), "Maintenance tasks started");
        handles
    }

    async fn run_every<F, Fut>(self: &Arc<Self>, period: Duration, task: F)
    where
        F: Fn(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            task(self.clone()).await;
        }
    }

    pub async fn sweep_csrf(&self) -> usize {
        let removed = self.csrf.sweep().await;
        metrics()
            .csrf_tokens_outstanding
            .set(self.csrf.outstanding().await);
        removed
    }

    pub async fn cleanup_rate_limits(&self) -> usize {
        let mut removed = self.rate_limiter.cleanup_stale().await;
        if let Some(limiter) = &self.token_limiter {
            removed += limiter.cleanup_stale().await;
        }
        removed
    }

    pub async fn save_snapshot(&self) {
        match self.rate_limiter.save_snapshot().await {
            Ok(saved) => debug!(entries = saved, "Saved rate limit snapshot"),
            Err(e) => error!("Failed to save rate limit snapshot: {}", e),
        }
    }

    /// Probe the store and record the result in the health registry.
    pub async fn check_store_health(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        let healthy = store.ping().await;
        if healthy {
            health().database.set_healthy();
        } else {
            health()
                .database
                .set_unhealthy(format!("{} store unreachable", store.name()));
        }
        healthy
    }

    pub async fn log_metrics(&self) {
        let snap = metrics().snapshot();
        info!(
            received = snap.submissions_received,
            accepted = snap.submissions_accepted,
            rate_limited = snap.rate_limited,
            csrf_rejected = snap.csrf_rejected,
            bot_rejected = snap.bot_rejected,
            validation_failed = snap.validation_failed,
            store_errors = snap.store_errors,
            webhook_delivered = snap.webhook_delivered,
            webhook_failed = snap.webhook_failed,
            emails_sent = snap.emails_sent,
            emails_failed = snap.emails_failed,
            intake_latency_mean_ms = snap.intake_latency_mean_ms,
            queue_depth = snap.dispatch_queue_depth,
            "Gateway metrics"
        );
    }
}

//! Internal metrics collection.
//!
//! Counters live in memory and are logged periodically by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the lead gateway.
#[derive(Debug, Default)]
pub struct Metrics {
    // Intake
    pub submissions_received: Counter,
    pub submissions_accepted: Counter,
    pub rate_limited: Counter,
    pub csrf_rejected: Counter,
    pub bot_rejected: Counter,
    pub validation_failed: Counter,
    pub csrf_tokens_issued: Counter,

    // Durable step
    pub store_errors: Counter,

    // Delivery
    pub webhook_delivered: Counter,
    pub webhook_failed: Counter,
    pub emails_sent: Counter,
    pub emails_failed: Counter,

    // Latency
    pub intake_latency_ms: Histogram,
    pub recaptcha_latency_ms: Histogram,
    pub delivery_latency_ms: Histogram,

    // Gauges
    pub dispatch_queue_depth: Gauge,
    pub csrf_tokens_outstanding: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub submissions_received: u64,
    pub submissions_accepted: u64,
    pub rate_limited: u64,
    pub csrf_rejected: u64,
    pub bot_rejected: u64,
    pub validation_failed: u64,
    pub csrf_tokens_issued: u64,
    pub store_errors: u64,
    pub webhook_delivered: u64,
    pub webhook_failed: u64,
    pub emails_sent: u64,
    pub emails_failed: u64,
    pub intake_latency_mean_ms: f64,
    pub recaptcha_latency_mean_ms: f64,
    pub delivery_latency_mean_ms: f64,
    pub dispatch_queue_depth: u64,
    pub csrf_tokens_outstanding: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            submissions_received: self.submissions_received.get(),
            submissions_accepted: self.submissions_accepted.get(),
            rate_limited: self.rate_limited.get(),
            csrf_rejected: self.csrf_rejected.get(),
            bot_rejected: self.bot_rejected.get(),
            validation_failed: self.validation_failed.get(),
            csrf_tokens_issued: self.csrf_tokens_issued.get(),
            store_errors: self.store_errors.get(),
            webhook_delivered: self.webhook_delivered.get(),
            webhook_failed: self.webhook_failed.get(),
            emails_sent: self.emails_sent.get(),
            emails_failed: self.emails_failed.get(),
            intake_latency_mean_ms: self.intake_latency_ms.mean(),
            recaptcha_latency_mean_ms: self.recaptcha_latency_ms.mean(),
            delivery_latency_mean_ms: self.delivery_latency_ms.mean(),
            dispatch_queue_depth: self.dispatch_queue_depth.get(),
            csrf_tokens_outstanding: self.csrf_tokens_outstanding.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

//! Mock implementations for testing.
//!
//! Each mock implements the same trait as its production counterpart, so
//! the real router and dispatcher run unchanged against them.

use async_trait::async_trait;
use delivery::{Mailer, OutboundEmail, SubmissionForwarder, WebhookPayload};
use guard::{BotScorer, BotVerdict};
use intake_core::{Error, Result, Submission};
use parking_lot::Mutex;
use std::sync::Arc;
use storage::SubmissionStore;

/// Scorer that returns a fixed score with the production pass rule.
#[derive(Clone)]
pub struct MockScorer {
    score: Arc<Mutex<f64>>,
    threshold: f64,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockScorer {
    pub fn new(score: f64) -> Self {
        Self {
            score: Arc::new(Mutex::new(score)),
            threshold: 0.5,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_score(&self, score: f64) {
        *self.score.lock() = score;
    }

    /// `(token, remote_ip)` for every verification.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BotScorer for MockScorer {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> BotVerdict {
        self.calls
            .lock()
            .push((token.to_string(), remote_ip.map(String::from)));

        let score = *self.score.lock();
        if score >= self.threshold {
            BotVerdict::pass(score)
        } else {
            BotVerdict::fail(Some(score))
        }
    }
}

/// Forwarder that captures payloads in memory.
#[derive(Clone, Default)]
pub struct MockForwarder {
    payloads: Arc<Mutex<Vec<WebhookPayload>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<WebhookPayload> {
        self.payloads.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl SubmissionForwarder for MockForwarder {
    async fn forward(&self, payload: &WebhookPayload) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::delivery("Mock webhook failure"));
        }
        self.payloads.lock().push(payload.clone());
        Ok(())
    }
}

/// Mailer that captures sent messages in memory.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::delivery("Mock email failure"));
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

/// In-memory store with a failure switch.
#[derive(Clone, Default)]
pub struct MockStore {
    saved: Arc<Mutex<Vec<Submission>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<Submission> {
        self.saved.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl SubmissionStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn save(&self, submission: &Submission) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::storage("Mock store failure"));
        }
        self.saved.lock().push(submission.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Submission>> {
        Ok(self
            .saved
            .lock()
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> bool {
        !*self.should_fail.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scorer_threshold() {
        let scorer = MockScorer::new(0.5);
        assert!(scorer.verify("t", None).await.passed);

        scorer.set_score(0.49);
        let verdict = scorer.verify("t", Some("10.0.0.1")).await;
        assert!(!verdict.passed);
        assert_eq!(verdict.score, Some(0.49));
        assert_eq!(scorer.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_store_failure_mode() {
        let store = MockStore::new();
        store.set_should_fail(true);
        assert!(!store.ping().await);
        assert!(store.recent(10).await.unwrap().is_empty());
    }
}

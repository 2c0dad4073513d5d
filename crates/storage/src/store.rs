//! Submission store abstraction and the in-memory implementation.

use async_trait::async_trait;
use intake_core::{Result, Submission};
use parking_lot::RwLock;

/// Append-only persistence for accepted submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    async fn save(&self, submission: &Submission) -> Result<()>;

    /// Most recent submissions first.
    async fn recent(&self, limit: u32) -> Result<Vec<Submission>>;

    /// Whether the backend is reachable.
    async fn ping(&self) -> bool;
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemorySubmissionStore {
    rows: RwLock<Vec<Submission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, submission: &Submission) -> Result<()> {
        self.rows.write().push(submission.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Submission>> {
        let rows = self.rows.read();
        Ok(rows.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn ping(&self) -> bool {
        true
    }
}

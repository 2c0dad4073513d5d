//! JSON file snapshots of rate limit windows.
//!
//! The file maps each key to `{"count": n, "windowStart": ms}`. Writes go to
//! a sibling temp file first and are renamed into place.

use intake_core::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::rate_limit::RateLimitEntry;

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads entries younger than `max_age_ms`. A missing file yields no entries.
    pub async fn load(&self, now_ms: i64, max_age_ms: i64) -> Result<Vec<(String, RateLimitEntry)>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::internal(format!(
                    "Failed to read snapshot {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let entries: HashMap<String, RateLimitEntry> = match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                // A corrupt snapshot only costs us the restored windows.
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable rate limit snapshot");
                return Ok(Vec::new());
            }
        };

        Ok(entries
            .into_iter()
            .filter(|(_, e)| now_ms - e.window_start < max_age_ms)
            .collect())
    }

    pub async fn save(&self, entries: Vec<(String, RateLimitEntry)>) -> Result<()> {
        let map: HashMap<String, RateLimitEntry> = entries.into_iter().collect();
        let json = serde_json::to_vec(&map)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::internal(format!("Failed to create snapshot dir: {}", e)))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::internal(format!("Failed to write snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::internal(format!("Failed to replace snapshot: {}", e)))?;

        Ok(())
    }
}

//! Submission persistence for the lead gateway.

pub mod clickhouse_store;
pub mod config;
pub mod schema;
pub mod store;

pub use clickhouse_store::{ClickHouseStore, ContactRow};
pub use config::*;
pub use store::{MemorySubmissionStore, SubmissionStore};

use intake_core::Result;
use std::sync::Arc;
use tracing::info;

/// Build the configured store. `None` means no store is configured.
pub async fn build_store(config: &StorageConfig) -> Result<Option<Arc<dyn SubmissionStore>>> {
    match config.backend {
        StorageBackend::None => Ok(None),
        StorageBackend::Memory => {
            info!("Using in-memory submission store");
            Ok(Some(Arc::new(MemorySubmissionStore::new())))
        }
        StorageBackend::ClickHouse => {
            let store = ClickHouseStore::new(config.clickhouse.clone());
            if config.clickhouse.init_schema {
                store.init_schema().await?;
            }
            Ok(Some(Arc::new(store)))
        }
    }
}

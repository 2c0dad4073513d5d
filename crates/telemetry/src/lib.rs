//! Telemetry for the lead gateway.
//!
//! Metrics and health live in process-wide registries and are exposed
//! through the health endpoints and the periodic metrics log.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;

//! Background work for the lead gateway.
//!
//! - Dispatcher (webhook and email delivery after the durable step)
//! - Scheduler (CSRF sweep, rate-limit cleanup and snapshots, store health, metrics log)

pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::*;
pub use scheduler::*;

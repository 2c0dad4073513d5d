//! Shared helpers for the gateway integration tests.

pub mod fixtures;
pub mod mocks;

//! Core types, error codes, and form validation for the lead gateway.

pub mod error;
pub mod limits;
pub mod submission;
pub mod validation;

pub use error::{Error, Result};
pub use submission::*;
pub use validation::{validate_contact_form, FieldErrors, ValidationResult};

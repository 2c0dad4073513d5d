//! Field bounds and request size limits for the lead gateway.
//!
//! Lengths are counted in characters after trimming surrounding whitespace.

// === Request Limits ===

/// Maximum contact form body size in bytes (16KB).
///
/// The largest legal form (all fields at max length) is well under 8KB.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

// === Field Bounds ===

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;

/// Email max length (matches the `contacts.email` column).
pub const EMAIL_MAX_LEN: usize = 255;

pub const COMPANY_MIN_LEN: usize = 2;
pub const COMPANY_MAX_LEN: usize = 200;

pub const MESSAGE_MIN_LEN: usize = 10;
pub const MESSAGE_MAX_LEN: usize = 2000;

/// Landing-form context fields (country display text, challenge key and label).
pub const COUNTRY_MAX_LEN: usize = 100;
pub const CHALLENGE_MAX_LEN: usize = 100;
pub const CHALLENGE_LABEL_MAX_LEN: usize = 200;

/// WhatsApp number pattern: optional leading `+`, 8 to 20 digits.
pub const PHONE_PATTERN: &str = r"^\+?[0-9]{8,20}$";

// === Metadata Limits ===

/// User agent string max length stored with a submission.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// IP address max length (IPv6 = 45 chars).
pub const MAX_IP_LEN: usize = 45;

/// Source tag max length (e.g. "website", "landing-pricing").
pub const MAX_SOURCE_LEN: usize = 64;

// === Listing ===

/// Default page size for the admin submissions listing.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Maximum page size for the admin submissions listing.
pub const MAX_LIST_LIMIT: u32 = 500;

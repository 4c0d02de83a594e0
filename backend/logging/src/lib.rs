//! Structured logging for PageSight.
//!
//! Console output for people, daily-rotated NDJSON files for later digging,
//! and a redaction pass for anything that may carry credentials.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;

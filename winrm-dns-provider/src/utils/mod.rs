//! Utility modules.

/// Log sanitization utilities to keep large remote payloads out of logs.
pub mod log_sanitizer;

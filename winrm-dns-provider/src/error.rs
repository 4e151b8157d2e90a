use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all record operations against a Windows DNS server.
///
/// Every variant carries enough context (operation, record triple, raw stderr
/// and exit code where applicable) for the caller to decide whether to retry
/// or abort. Nothing in this crate retries on its own.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum DnsError {
    /// The WinRM session could not be established (unreachable host, bad credentials).
    #[error("[{endpoint}] Connection error: {detail}")]
    Connection {
        /// WinRM endpoint URL.
        endpoint: String,
        /// Error details.
        detail: String,
    },

    /// The script was sent but the remote call failed, or the script itself
    /// reported failure through stderr or a non-zero exit code.
    #[error("{operation} failed (exit code {exit_code}): {stderr}")]
    Transport {
        /// Operation that was running (e.g. `create`, `query`).
        operation: String,
        /// Captured stderr, or the transport failure description.
        stderr: String,
        /// Remote exit code, `-1` when the command never completed.
        exit_code: i32,
    },

    /// The remote call did not finish within the configured deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation that was running.
        operation: String,
        /// Deadline that elapsed.
        seconds: u64,
    },

    /// Unsupported record type or input that cannot be rendered safely into a script.
    #[error("Template error: {detail}")]
    Template {
        /// Details about the rejected input.
        detail: String,
    },

    /// Remote output could not be decoded into the expected shape.
    #[error("Parse error: {detail}")]
    Parse {
        /// Details about the parse failure.
        detail: String,
    },

    /// No record matches the given ID or (zone, name, value) triple.
    #[error("Record '{record}' not found")]
    NotFound {
        /// Composite ID or triple that was looked up.
        record: String,
    },

    /// A record with the same (zone, name, value) already exists.
    #[error("Record '{record}' already exists")]
    AlreadyExists {
        /// Composite ID of the conflicting record.
        record: String,
    },

    /// A composite ID that does not split into exactly `zone|name|value`.
    #[error("Invalid record ID '{id}': expected <zone>|<name>|<value>")]
    InvalidId {
        /// The rejected ID string.
        id: String,
    },
}

impl DnsError {
    /// Whether this is an expected outcome (caller input, missing record) rather
    /// than an infrastructure failure. Used to pick `warn` over `error` when logging.
    ///
    /// **Update this when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Template { .. }
                | Self::NotFound { .. }
                | Self::AlreadyExists { .. }
                | Self::InvalidId { .. }
        )
    }

    pub(crate) fn not_found(record: impl Into<String>) -> Self {
        Self::NotFound {
            record: record.into(),
        }
    }

    pub(crate) fn template(detail: impl Into<String>) -> Self {
        Self::Template {
            detail: detail.into(),
        }
    }

    pub(crate) fn parse(detail: impl ToString) -> Self {
        Self::Parse {
            detail: detail.to_string(),
        }
    }
}

/// Convenience type alias for `Result<T, DnsError>`.
pub type Result<T> = std::result::Result<T, DnsError>;

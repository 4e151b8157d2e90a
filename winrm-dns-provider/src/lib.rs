//! # winrm-dns-provider
//!
//! Manage A and CNAME records on a Windows DNS server over WinRM.
//!
//! Every operation renders a `PowerShell` script against the `DnsServer`
//! module, ships it to the server as `powershell.exe -EncodedCommand <b64>`
//! and normalizes the JSON the server prints back into [`Record`]s.
//!
//! ## Components
//!
//! | Component | Type | Role |
//! |-----------|------|------|
//! | Session client | [`WinRmSession`] | Authenticated WS-Management shell, implements [`RemoteShell`] |
//! | Script renderer | [`PowerShellRenderer`] | [`ScriptOp`] → script text |
//! | Command encoder | [`encode_command`] | UTF-16LE + base64 command line |
//! | Response normalizer | [`normalize`] | Remote JSON → `Vec<Record>` |
//! | Record engine | [`RecordEngine`] | Create/read/update/delete/exists, serialized per server |
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: use the platform's native TLS implementation.
//! - **`rustls`**: use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use winrm_dns_provider::{ConnectionConfig, Record, RecordEngine, RecordType, WinRmSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::new("dc01.test.local", "Administrator", "secret");
//!     let session = WinRmSession::connect(&config).await?;
//!     let engine = RecordEngine::new(Arc::new(session));
//!
//!     let record = Record::new("test.local", "www", RecordType::A, "10.0.0.10", 3600);
//!     let created = engine.create(&record).await?;
//!     println!("created {}", created.identity());
//!
//!     // Changing the value changes the ID; keep the returned one.
//!     let updated = engine.update(&created, Some("10.0.0.11"), None).await?;
//!     engine.delete(&updated).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Record IDs
//!
//! Records are identified by `zone|name|value` (see [`RecordId`]). A name may
//! carry several values, so the value is part of the identity. Updating the
//! value yields a record with a new ID; the old ID no longer resolves.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, DnsError>`](DnsError). Nothing is
//! retried; [`DnsError::is_expected`] separates caller-level outcomes
//! (`NotFound`, `AlreadyExists`, ...) from infrastructure failures.

mod config;
mod encoder;
mod engine;
mod error;
mod normalize;
mod script;
mod traits;
mod types;
mod utils;
mod winrm;

pub use config::{
    ConnectionConfig, DEFAULT_HTTP_PORT, DEFAULT_HTTPS_PORT, DEFAULT_OPERATION_TIMEOUT_SECS,
};
pub use encoder::encode_command;
pub use engine::RecordEngine;
pub use error::{DnsError, Result};
pub use normalize::normalize;
pub use script::{PowerShellRenderer, ScriptOp, ScriptRenderer, StagedChanges};
pub use traits::{RemoteShell, ScriptOutput};
pub use types::{Record, RecordId, RecordType};
pub use winrm::WinRmSession;

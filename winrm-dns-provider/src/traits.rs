use async_trait::async_trait;

use crate::error::{DnsError, Result};

/// Marker `PowerShell` writes into stderr when a cmdlet fails.
const ERROR_MARKER: &str = "Error";

/// Raw result of one remote script execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ScriptOutput {
    /// Turns a failed execution into [`DnsError::Transport`].
    ///
    /// A non-zero exit code, or stderr containing `Error`, is a failure even
    /// when some stdout was produced.
    pub fn ensure_success(self, operation: &str) -> Result<Self> {
        if self.exit_code != 0 || self.stderr.contains(ERROR_MARKER) {
            return Err(DnsError::Transport {
                operation: operation.to_string(),
                stderr: self.stderr,
                exit_code: self.exit_code,
            });
        }
        Ok(self)
    }
}

/// An authenticated remote execution channel to one DNS server.
///
/// Implementations run the script text to completion and report what the
/// remote interpreter produced. They do not interpret the output.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Endpoint identifier used in logs.
    fn endpoint(&self) -> &str;

    /// Executes a script and waits for it to finish.
    async fn execute(&self, script: &str) -> Result<ScriptOutput>;
}

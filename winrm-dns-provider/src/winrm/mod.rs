//! WinRM (WS-Management) remote shell client.
//!
//! Each script runs in its own short-lived `cmd` shell: create shell, run one
//! command, poll its output until done, terminate the command, delete the shell.

mod envelope;
mod http;
mod response;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ConnectionConfig;
use crate::encoder::encode_command;
use crate::error::{DnsError, Result};
use crate::traits::{RemoteShell, ScriptOutput};

use envelope::Action;

const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Must exceed the WS-Management `OperationTimeout` so that Receive faults
/// arrive before the HTTP client gives up.
pub(crate) const HTTP_REQUEST_TIMEOUT_SECS: u64 = envelope::OPERATION_TIMEOUT_SECS + 40;

/// An authenticated WinRM endpoint on a Windows DNS server.
pub struct WinRmSession {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) username: String,
    pub(crate) password: String,
    operation_timeout: Duration,
}

impl fmt::Debug for WinRmSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WinRmSession")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl WinRmSession {
    /// Builds the HTTP client for `config` without contacting the server.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let endpoint = config.endpoint_url();
        if config.server.trim().is_empty() {
            return Err(DnsError::Connection {
                endpoint,
                detail: "server must not be empty".to_string(),
            });
        }

        let builder = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS));
        #[cfg(any(feature = "native-tls", feature = "rustls"))]
        let builder = builder.danger_accept_invalid_certs(config.insecure);

        let client = builder
            .build()
            .map_err(|e| DnsError::Connection {
                endpoint: endpoint.clone(),
                detail: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Builds the session and proves reachability and credentials by opening
    /// and closing one shell.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let session = Self::new(config)?;
        let shell_id = session.open_shell().await?;
        session.close_shell(&shell_id).await;
        log::info!("[{}] WinRM session established", session.endpoint);
        Ok(session)
    }

    async fn open_shell(&self) -> Result<String> {
        let resp = self
            .post_expecting_success(Action::CreateShell, envelope::create_shell(&self.endpoint))
            .await?;
        resp.shell_id
            .ok_or_else(|| DnsError::parse("CreateShell response carries no ShellId"))
    }

    /// Best-effort shell deletion. Failures only leave an idle shell behind.
    async fn close_shell(&self, shell_id: &str) {
        let env = envelope::delete_shell(&self.endpoint, shell_id);
        if let Err(e) = self.post_expecting_success(Action::DeleteShell, env).await {
            log::warn!("[{}] Failed to delete shell {shell_id}: {e}", self.endpoint);
        }
    }

    async fn run(&self, script: &str) -> Result<ScriptOutput> {
        let shell_id = self.open_shell().await?;
        let result = self.run_in_shell(&shell_id, script).await;
        self.close_shell(&shell_id).await;
        result
    }

    async fn run_in_shell(&self, shell_id: &str, script: &str) -> Result<ScriptOutput> {
        let env = envelope::command(&self.endpoint, shell_id, &encode_command(script));
        let command_id = self
            .post_expecting_success(Action::Command, env)
            .await?
            .command_id
            .ok_or_else(|| DnsError::parse("Command response carries no CommandId"))?;

        let output = self.receive_output(shell_id, &command_id).await;

        let env = envelope::signal_terminate(&self.endpoint, shell_id, &command_id);
        if let Err(e) = self.post_expecting_success(Action::Signal, env).await {
            log::warn!(
                "[{}] Failed to terminate command {command_id}: {e}",
                self.endpoint
            );
        }

        output
    }

    async fn receive_output(&self, shell_id: &str, command_id: &str) -> Result<ScriptOutput> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        loop {
            let env = envelope::receive(&self.endpoint, shell_id, command_id);
            let resp = self.post(Action::Receive, env).await?;

            if let Some(fault) = &resp.fault {
                if fault.is_timed_out() {
                    log::debug!("[{}] Receive timed out, polling again", self.endpoint);
                    continue;
                }
                return Err(DnsError::Transport {
                    operation: Action::Receive.name().to_string(),
                    stderr: fault.message.clone(),
                    exit_code: -1,
                });
            }

            stdout.extend(resp.stdout);
            stderr.extend(resp.stderr);

            if resp.command_done {
                return Ok(ScriptOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: resp.exit_code.unwrap_or(0),
                });
            }
        }
    }
}

#[async_trait]
impl RemoteShell for WinRmSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, script: &str) -> Result<ScriptOutput> {
        tokio::time::timeout(self.operation_timeout, self.run(script))
            .await
            .map_err(|_| DnsError::Timeout {
                operation: "execute".to_string(),
                seconds: self.operation_timeout.as_secs(),
            })?
    }
}

//! WinRM connection settings.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Default WinRM port over plain HTTP.
pub const DEFAULT_HTTP_PORT: u16 = 5985;
/// Default WinRM port over HTTPS.
pub const DEFAULT_HTTPS_PORT: u16 = 5986;
/// Default deadline for a single script execution (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

/// Connection settings for one Windows DNS server.
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Host name or address of the DNS server.
    pub server: String,
    pub username: String,
    pub password: String,
    /// Explicit WinRM port. Falls back to 5986 (HTTPS) or 5985 (HTTP).
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub https: bool,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
    /// Deadline for each remote script execution.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl ConnectionConfig {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
            port: None,
            https: false,
            insecure: false,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.https {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        })
    }

    /// WS-Management endpoint, e.g. `http://dc01:5985/wsman`.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}:{}/wsman", self.server, self.effective_port())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .field("https", &self.https)
            .field("insecure", &self.insecure)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_follows_scheme() {
        let mut cfg = ConnectionConfig::new("dc01", "admin", "secret");
        assert_eq!(cfg.effective_port(), 5985);
        cfg.https = true;
        assert_eq!(cfg.effective_port(), 5986);
        cfg.port = Some(15986);
        assert_eq!(cfg.effective_port(), 15986);
    }

    #[test]
    fn endpoint_url_uses_scheme_and_port() {
        let mut cfg = ConnectionConfig::new("dc01.test.local", "admin", "secret");
        assert_eq!(cfg.endpoint_url(), "http://dc01.test.local:5985/wsman");
        cfg.https = true;
        assert_eq!(cfg.endpoint_url(), "https://dc01.test.local:5986/wsman");
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = ConnectionConfig::new("dc01", "admin", "hunter2");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let cfg: ConnectionConfig =
            serde_json::from_str(r#"{"server":"dc01","username":"u","password":"p"}"#).unwrap();
        assert_eq!(cfg.port, None);
        assert!(!cfg.https);
        assert!(!cfg.insecure);
        assert_eq!(cfg.operation_timeout(), Duration::from_secs(120));
    }
}

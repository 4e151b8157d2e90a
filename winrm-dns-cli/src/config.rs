//! Connection settings: `~/.winrm-dns-client.toml`, overridden by flags and
//! `WINRM_DNS_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use winrm_dns_provider::{ConnectionConfig, DEFAULT_OPERATION_TIMEOUT_SECS};

use crate::cli::GlobalOptions;

const CONFIG_FILE_NAME: &str = ".winrm-dns-client.toml";

/// Contents of the configuration file. Every field is optional.
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub https: Option<bool>,
    pub insecure: Option<bool>,
    /// Per-script deadline in seconds.
    pub timeout: Option<u64>,
}

/// `~/.winrm-dns-client.toml`, if a home directory is known.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Reads the configuration file.
///
/// A missing default file is not an error; a missing explicit one is.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Merges file settings with command-line/environment overrides.
pub fn resolve(opts: &GlobalOptions, file: FileConfig) -> Result<ConnectionConfig> {
    let server = opts.server.clone().or(file.server);
    let username = opts.username.clone().or(file.username);
    let password = opts.password.clone().or(file.password);

    let mut missing = Vec::new();
    if server.as_deref().is_none_or(str::is_empty) {
        missing.push("server (--server / WINRM_DNS_SERVER)");
    }
    if username.as_deref().is_none_or(str::is_empty) {
        missing.push("username (--username / WINRM_DNS_USERNAME)");
    }
    if password.is_none() {
        missing.push("password (--password / WINRM_DNS_PASSWORD)");
    }
    if !missing.is_empty() {
        bail!("missing connection settings: {}", missing.join(", "));
    }

    let mut config = ConnectionConfig::new(
        server.unwrap_or_default(),
        username.unwrap_or_default(),
        password.unwrap_or_default(),
    );
    config.port = opts.port.or(file.port);
    config.https = opts.https || file.https.unwrap_or(false);
    config.insecure = opts.insecure || file.insecure.unwrap_or(false);
    config.operation_timeout_secs = opts
        .timeout
        .or(file.timeout)
        .unwrap_or(DEFAULT_OPERATION_TIMEOUT_SECS);
    Ok(config)
}

//! winrm-dns-client - manage A and CNAME records on a Windows DNS server.
//!
//! # Usage
//!
//! ```bash
//! export WINRM_DNS_SERVER=dc01.test.local
//! export WINRM_DNS_USERNAME=Administrator
//! export WINRM_DNS_PASSWORD=...
//!
//! winrm-dns-client read --zone test.local
//! winrm-dns-client create --zone test.local --name www --type A --value 10.0.0.10 --ttl 1h0m0s
//! winrm-dns-client update --id 'test.local|www|10.0.0.10' --new-value 10.0.0.11
//! winrm-dns-client exists --zone test.local --name www --value 10.0.0.11 && echo present
//! winrm-dns-client --json delete --id 'test.local|www|10.0.0.11'
//! ```
//!
//! Settings can also live in `~/.winrm-dns-client.toml`:
//!
//! ```toml
//! server = "dc01.test.local"
//! username = "Administrator"
//! password = "..."
//! https = true
//! insecure = true
//! ```

mod cli;
mod config;
mod duration;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use winrm_dns_provider::DnsError;

use cli::Cli;

/// Logs go to stderr so table/JSON output on stdout stays clean.
///
/// `RUST_LOG` wins when set; otherwise `warn`, raised by `-v`/`-vv`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            if is_expected(&e) {
                tracing::warn!("Command rejected: {e}");
            } else {
                tracing::error!("Command failed: {e:?}");
            }
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Caller-level outcomes (missing record, bad ID, ...) as opposed to
/// connection or server failures.
fn is_expected(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DnsError>()
        .is_some_and(DnsError::is_expected)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn dns_outcomes_are_expected() {
        let err = anyhow::Error::from(DnsError::AlreadyExists {
            record: "z|n|v".into(),
        });
        assert!(is_expected(&err));

        let parsed: Result<winrm_dns_provider::RecordId, _> = "z|n".parse();
        assert!(is_expected(&anyhow::Error::from(parsed.unwrap_err())));
    }

    #[test]
    fn infrastructure_failures_are_not_expected() {
        let err = anyhow::Error::from(DnsError::Timeout {
            operation: "query".into(),
            seconds: 120,
        });
        assert!(!is_expected(&err));

        let wrapped = Err::<(), _>(DnsError::Connection {
            endpoint: "http://dc01:5985/wsman".into(),
            detail: "refused".into(),
        })
        .context("failed to connect to dc01")
        .unwrap_err();
        assert!(!is_expected(&wrapped));

        assert!(!is_expected(&anyhow::anyhow!("missing connection settings")));
    }
}

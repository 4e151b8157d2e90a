//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use winrm_dns_provider::{Record, RecordEngine, RecordId, RecordType, WinRmSession};

use crate::config;
use crate::duration::{DEFAULT_TTL, parse_ttl};
use crate::output;

/// Manage A and CNAME records on a Windows DNS server over WinRM.
#[derive(Parser)]
#[command(name = "winrm-dns-client", version, about)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and output options shared by every command.
#[derive(Args, Clone)]
pub struct GlobalOptions {
    /// Configuration file (default: ~/.winrm-dns-client.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// DNS server host name or address.
    #[arg(long, env = "WINRM_DNS_SERVER", global = true)]
    pub server: Option<String>,

    #[arg(long, env = "WINRM_DNS_USERNAME", global = true)]
    pub username: Option<String>,

    #[arg(long, env = "WINRM_DNS_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// WinRM port (default: 5986 with --https, else 5985).
    #[arg(long, env = "WINRM_DNS_PORT", global = true)]
    pub port: Option<u16>,

    /// Connect over HTTPS.
    #[arg(long, env = "WINRM_DNS_HTTPS", global = true)]
    pub https: bool,

    /// Skip TLS certificate verification.
    #[arg(long, env = "WINRM_DNS_INSECURE", global = true)]
    pub insecure: bool,

    /// Deadline for each remote script, in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records of a zone, or read one record by ID.
    Read(ReadArgs),
    /// Create a record.
    Create(CreateArgs),
    /// Change a record's value and/or TTL.
    Update(UpdateArgs),
    /// Delete a record.
    Delete(RecordSelector),
    /// Check whether a record exists (exit code 0 if it does, 1 if not).
    Exists(RecordSelector),
}

#[derive(Args)]
pub struct ReadArgs {
    /// Composite record ID `zone|name|value`.
    #[arg(long, conflicts_with_all = ["zone", "name"])]
    pub id: Option<String>,

    #[arg(long)]
    pub zone: Option<String>,

    /// Only records with this host name.
    #[arg(long, requires = "zone")]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub zone: String,

    #[arg(long)]
    pub name: String,

    /// A or CNAME.
    #[arg(long = "type")]
    pub record_type: RecordType,

    /// IPv4 address (A) or alias target (CNAME).
    #[arg(long)]
    pub value: String,

    /// TTL as a duration (`1h0m0s`, `15m`, `300`).
    #[arg(long, default_value = DEFAULT_TTL, value_parser = parse_ttl)]
    pub ttl: u32,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub record: RecordSelector,

    #[arg(long)]
    pub new_value: Option<String>,

    #[arg(long, value_parser = parse_ttl)]
    pub new_ttl: Option<u32>,
}

/// Identifies one record, by ID or by zone, name and value.
#[derive(Args)]
pub struct RecordSelector {
    /// Composite record ID `zone|name|value`.
    #[arg(long, conflicts_with_all = ["zone", "name", "value"])]
    pub id: Option<String>,

    #[arg(long)]
    pub zone: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub value: Option<String>,
}

impl RecordSelector {
    /// Lookup record for the engine. The type is a placeholder: lookups
    /// match on zone, name and value, and the server's record decides.
    pub fn to_record(&self) -> Result<Record> {
        if let Some(id) = &self.id {
            let id: RecordId = id.parse()?;
            let mut record = Record::new(id.zone(), id.name(), RecordType::A, id.value(), 0);
            record.id = Some(id);
            return Ok(record);
        }

        match (&self.zone, &self.name, &self.value) {
            (Some(zone), Some(name), Some(value)) => {
                Ok(Record::new(zone, name, RecordType::A, value, 0))
            }
            _ => bail!("either --id or all of --zone, --name and --value are required"),
        }
    }
}

/// A command with its arguments checked, ready to run against a server.
enum Request {
    ReadById(String),
    ReadAll { zone: String, name: Option<String> },
    Create(Record),
    Update {
        record: Record,
        new_value: Option<String>,
        new_ttl: Option<u32>,
    },
    Delete(Record),
    Exists(Record),
}

impl Commands {
    /// Validates arguments without touching the network.
    fn into_request(self) -> Result<Request> {
        Ok(match self {
            Self::Read(args) => match (args.id, args.zone) {
                (Some(id), _) => Request::ReadById(id),
                (None, Some(zone)) => Request::ReadAll {
                    zone,
                    name: args.name,
                },
                (None, None) => bail!("either --id or --zone is required"),
            },
            Self::Create(args) => Request::Create(Record::new(
                args.zone,
                args.name,
                args.record_type,
                args.value,
                args.ttl,
            )),
            Self::Update(args) => Request::Update {
                record: args.record.to_record()?,
                new_value: args.new_value,
                new_ttl: args.new_ttl,
            },
            Self::Delete(selector) => Request::Delete(selector.to_record()?),
            Self::Exists(selector) => Request::Exists(selector.to_record()?),
        })
    }
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let json = self.global.json;
        let request = self.command.into_request()?;
        let file = config::load(self.global.config.as_deref())?;
        let connection = config::resolve(&self.global, file)?;

        let session = WinRmSession::connect(&connection)
            .await
            .with_context(|| format!("failed to connect to {}", connection.server))?;
        let engine = RecordEngine::new(Arc::new(session));

        match request {
            Request::ReadById(id) => {
                let record = engine.read_by_id(&id).await?;
                output::print_records(&[record], json);
            }
            Request::ReadAll { zone, name } => {
                let records = engine.read_all(&zone, name.as_deref()).await?;
                output::print_records(&records, json);
            }
            Request::Create(record) => {
                let created = engine.create(&record).await?;
                output::print_records(&[created], json);
            }
            Request::Update {
                record,
                new_value,
                new_ttl,
            } => {
                let updated = engine
                    .update(&record, new_value.as_deref(), new_ttl)
                    .await?;
                if updated.identity() != record.identity() {
                    tracing::warn!(
                        "Record ID changed from {} to {}",
                        record.identity(),
                        updated.identity()
                    );
                }
                output::print_records(&[updated], json);
            }
            Request::Delete(record) => {
                engine.delete(&record).await?;
                output::print_deleted(&record, json);
            }
            Request::Exists(record) => {
                let exists = engine.exists(&record).await;
                output::print_exists(exists, json);
                if !exists {
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

//! Shared test helpers: an in-memory Windows DNS server that interprets the
//! rendered `DnsServer` cmdlet scripts.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use winrm_dns_provider::{
    ConnectionConfig, DnsError, RecordEngine, RemoteShell, Result, ScriptOutput, WinRmSession,
};

/// Skips a test when required environment variables are missing.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("Skipping test: missing environment variable {}", $var);
                return;
            }
        )+
    };
}

/// Asserts `Result` is `Ok` and unwraps it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

pub const ZONE: &str = "test.local";

/// A record as held by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub zone: String,
    pub name: String,
    pub record_type: String,
    pub value: String,
    pub ttl: u32,
}

impl StoredRecord {
    pub fn a(name: &str, value: &str, ttl: u32) -> Self {
        Self {
            zone: ZONE.to_string(),
            name: name.to_string(),
            record_type: "A".to_string(),
            value: value.to_string(),
            ttl,
        }
    }

    pub fn cname(name: &str, alias: &str, ttl: u32) -> Self {
        Self {
            record_type: "CNAME".to_string(),
            ..Self::a(name, alias, ttl)
        }
    }

    fn value_field(&self) -> &'static str {
        if self.record_type == "A" {
            "IPv4Address"
        } else {
            "HostNameAlias"
        }
    }

    /// `Select-Object | ConvertTo-Json` projection of one record. A records
    /// carry `CimInstanceProperties` as a string, CNAME records as a list.
    fn to_json(&self) -> Value {
        let property = format!("{} = \"{}\"", self.value_field(), self.value);
        let cim = if self.record_type == "A" {
            json!(property)
        } else {
            json!([property])
        };
        json!({
            "DistinguishedName": format!(
                "DC={},DC={},cn=MicrosoftDNS,DC=DomainDnsZones,DC=test,DC=local",
                self.name, self.zone
            ),
            "HostName": self.name,
            "RecordData": {
                "CimClass": format!("root/Microsoft/Windows/DNS:DnsServerResourceRecord{}", self.record_type),
                "CimInstanceProperties": cim,
                "CimSystemProperties": "Microsoft.Management.Infrastructure.CimSystemProperties"
            },
            "RecordType": self.record_type,
            "TimeToLive": {
                "Ticks": u64::from(self.ttl) * 10_000_000,
                "TotalSeconds": f64::from(self.ttl)
            }
        })
    }
}

#[derive(Default)]
struct ServerState {
    records: Vec<StoredRecord>,
    scripts: Vec<String>,
    injected: VecDeque<Result<ScriptOutput>>,
}

/// In-memory stand-in for a Windows DNS server reached through a remote shell.
#[derive(Default)]
pub struct FakeDnsServer {
    state: Mutex<ServerState>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDnsServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_records(records: Vec<StoredRecord>) -> Arc<Self> {
        let server = Self::new();
        server.state.lock().unwrap().records = records;
        server
    }

    pub fn engine(self: &Arc<Self>) -> RecordEngine {
        RecordEngine::new(Arc::clone(self) as Arc<dyn RemoteShell>)
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn insert(&self, record: StoredRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    /// Every script executed so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub fn script_count(&self) -> usize {
        self.state.lock().unwrap().scripts.len()
    }

    /// Makes the next execution return `result` instead of running the script.
    pub fn inject(&self, result: Result<ScriptOutput>) {
        self.state.lock().unwrap().injected.push_back(result);
    }

    /// Holds every execution for `delay` before running it.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of executions observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn interpret(&self, script: &str) -> ScriptOutput {
        let mut state = self.state.lock().unwrap();
        let first = script.lines().next().unwrap_or_default();

        if first.starts_with("Get-DnsServerResourceRecord") {
            query(&state.records, first)
        } else if first.starts_with("Add-DnsServerResourceRecord") {
            add(&mut state.records, first)
        } else if first.starts_with("$old = ") {
            set(&mut state.records, script)
        } else if first.starts_with("(Get-DnsServerResourceRecord") {
            remove(&mut state.records, first)
        } else {
            failure(&format!("The term '{first}' is not recognized"))
        }
    }
}

#[async_trait]
impl RemoteShell for FakeDnsServer {
    fn endpoint(&self) -> &str {
        "fake://dc01"
    }

    async fn execute(&self, script: &str) -> Result<ScriptOutput> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state.lock().unwrap();
            state.scripts.push(script.to_string());
            state.injected.pop_front()
        };
        let result = result.unwrap_or_else(|| Ok(self.interpret(script)));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============ Script interpretation ============

fn query(records: &[StoredRecord], line: &str) -> ScriptOutput {
    let zone = arg_after(line, "-ZoneName").unwrap_or_default();
    let name = arg_after(line, "-Name");

    let matches: Vec<Value> = records
        .iter()
        .filter(|r| r.zone == zone && name.is_none_or(|n| r.name == n))
        .map(StoredRecord::to_json)
        .collect();

    let stdout = match matches.len() {
        0 => String::new(),
        1 => serde_json::to_string_pretty(&matches[0]).unwrap(),
        _ => serde_json::to_string_pretty(&matches).unwrap(),
    };
    ScriptOutput {
        stdout,
        ..ScriptOutput::default()
    }
}

fn add(records: &mut Vec<StoredRecord>, line: &str) -> ScriptOutput {
    let record_type = if line.contains(" -CName ") { "CNAME" } else { "A" };
    let value_flag = if record_type == "A" {
        "-IPv4Address"
    } else {
        "-HostNameAlias"
    };
    let record = StoredRecord {
        zone: arg_after(line, "-ZoneName").unwrap_or_default().to_string(),
        name: arg_after(line, "-Name").unwrap_or_default().to_string(),
        record_type: record_type.to_string(),
        value: arg_after(line, value_flag).unwrap_or_default().to_string(),
        ttl: arg_after(line, "-Seconds")
            .and_then(|t| t.trim_end_matches(')').parse().ok())
            .unwrap_or(3600),
    };

    if records
        .iter()
        .any(|r| r.zone == record.zone && r.name == record.name && r.value == record.value)
    {
        return failure(&format!(
            "Add-DnsServerResourceRecord : Failed to create resource record {} in zone {} on server DC01.",
            record.name, record.zone
        ));
    }
    records.push(record);
    ScriptOutput::default()
}

fn set(records: &mut [StoredRecord], script: &str) -> ScriptOutput {
    let mut lines = script.lines();
    let lookup = lines.next().unwrap_or_default();
    let zone = arg_after(lookup, "-ZoneName").unwrap_or_default();
    let name = arg_after(lookup, "-Name").unwrap_or_default();
    let value = last_quoted(lookup).unwrap_or_default();

    let Some(target) = records
        .iter_mut()
        .find(|r| r.zone == zone && r.name == name && r.value == value)
    else {
        return failure(
            "Set-DnsServerResourceRecord : Cannot validate argument on parameter 'OldInputObject'.",
        );
    };

    for line in lines {
        if line.starts_with("$new.RecordData.") {
            if let Some(new_value) = last_quoted(line) {
                target.value = new_value.to_string();
            }
        } else if line.starts_with("$new.TimeToLive") {
            if let Some(ttl) = arg_after(line, "-Seconds").and_then(|t| t.parse().ok()) {
                target.ttl = ttl;
            }
        }
    }
    ScriptOutput::default()
}

fn remove(records: &mut Vec<StoredRecord>, line: &str) -> ScriptOutput {
    let zone = arg_after(line, "-ZoneName").unwrap_or_default().to_string();
    let name = arg_after(line, "-Name")
        .unwrap_or_default()
        .trim_end_matches(')')
        .to_string();
    let value = last_quoted(line).unwrap_or_default().to_string();

    records.retain(|r| !(r.zone == zone && r.name == name && r.value == value));
    ScriptOutput::default()
}

fn arg_after<'a>(line: &'a str, flag: &str) -> Option<&'a str> {
    let mut tokens = line.split_whitespace();
    tokens.find(|t| *t == flag)?;
    tokens.next()
}

fn last_quoted(line: &str) -> Option<&str> {
    let end = line.rfind('\'')?;
    let start = line[..end].rfind('\'')?;
    Some(&line[start + 1..end])
}

/// A successful execution printing `text`.
pub fn stdout(text: &str) -> ScriptOutput {
    ScriptOutput {
        stdout: text.to_string(),
        ..ScriptOutput::default()
    }
}

/// What a failed cmdlet leaves behind: CLIXML error stream, exit code 1.
pub fn failure(message: &str) -> ScriptOutput {
    ScriptOutput {
        stdout: String::new(),
        stderr: format!(
            "#< CLIXML\r\n<Objs Version=\"1.1.0.1\" xmlns=\"http://schemas.microsoft.com/powershell/2004/04\"><S S=\"Error\">{message}_x000D__x000A_</S></Objs>"
        ),
        exit_code: 1,
    }
}

pub fn transport_error(stderr: &str) -> DnsError {
    DnsError::Transport {
        operation: "Receive".to_string(),
        stderr: stderr.to_string(),
        exit_code: -1,
    }
}

// ============ Live server context ============

/// Engine connected to a real server configured through the environment.
pub struct LiveContext {
    pub engine: RecordEngine,
    pub zone: String,
}

impl LiveContext {
    pub async fn from_env() -> Option<Self> {
        let mut config = ConnectionConfig::new(
            env::var("WINRM_DNS_SERVER").ok()?,
            env::var("WINRM_DNS_USERNAME").ok()?,
            env::var("WINRM_DNS_PASSWORD").ok()?,
        );
        config.https = env::var("WINRM_DNS_HTTPS").is_ok_and(|v| v == "true");
        config.insecure = env::var("WINRM_DNS_INSECURE").is_ok_and(|v| v == "true");
        config.port = env::var("WINRM_DNS_PORT").ok().and_then(|p| p.parse().ok());

        let session = WinRmSession::connect(&config).await.ok()?;
        Some(Self {
            engine: RecordEngine::new(Arc::new(session)),
            zone: env::var("TEST_ZONE").ok()?,
        })
    }
}

/// Unique record name for live tests.
pub fn generate_test_record_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("test-{}", &uuid.to_string()[..8])
}

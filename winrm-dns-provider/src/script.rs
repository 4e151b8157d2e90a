//! `PowerShell` script rendering for record operations.
//!
//! The engine never builds script text itself; it describes an operation with
//! [`ScriptOp`] and hands it to a [`ScriptRenderer`].

use std::fmt::Write as _;

use crate::error::{DnsError, Result};
use crate::types::{Record, RecordType};

/// Characters that would escape the single-quoted literals or bare arguments
/// of the templates, or collide with the composite ID separator.
const FORBIDDEN_CHARS: &[char] = &['\'', '"', '`', '$', ';', '|', '(', ')', '{', '}'];

/// Replacement fields staged for an update. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedChanges {
    pub new_value: Option<String>,
    pub new_ttl: Option<u32>,
}

impl StagedChanges {
    pub fn is_empty(&self) -> bool {
        self.new_value.is_none() && self.new_ttl.is_none()
    }
}

/// A record operation to be rendered into a script.
#[derive(Debug, Clone, Copy)]
pub enum ScriptOp<'a> {
    /// List A/CNAME records in `zone`, optionally only those named `name`.
    Query { zone: &'a str, name: Option<&'a str> },
    Create(&'a Record),
    /// Replace `current` (located by its present value) with the staged changes applied.
    Update {
        current: &'a Record,
        changes: &'a StagedChanges,
    },
    Delete(&'a Record),
}

impl ScriptOp<'_> {
    /// Short operation name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// Turns record operations into executable script text.
pub trait ScriptRenderer: Send + Sync {
    fn render(&self, op: &ScriptOp<'_>) -> Result<String>;
}

/// Renders the `DnsServer` module cmdlets used on Windows Server 2012 and later.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerShellRenderer;

impl ScriptRenderer for PowerShellRenderer {
    fn render(&self, op: &ScriptOp<'_>) -> Result<String> {
        match *op {
            ScriptOp::Query { zone, name } => render_query(zone, name),
            ScriptOp::Create(rec) => render_create(rec),
            ScriptOp::Update { current, changes } => render_update(current, changes),
            ScriptOp::Delete(rec) => render_delete(rec),
        }
    }
}

// ============ Templates ============

fn render_query(zone: &str, name: Option<&str>) -> Result<String> {
    check_field("zone", zone)?;
    let name = name.filter(|n| !n.is_empty());
    if let Some(name) = name {
        check_field("name", name)?;
    }

    let mut script = format!("Get-DnsServerResourceRecord -ZoneName {zone}");
    if let Some(name) = name {
        let _ = write!(script, " -Name {name}");
    }
    script.push_str(" | ?{($_.RecordType -eq 'A' -or $_.RecordType -eq 'CNAME')");
    if let Some(name) = name {
        let _ = write!(script, " -and $_.HostName -eq '{name}'");
    }
    script.push_str(
        "} | select DistinguishedName, HostName, RecordData, RecordType, TimeToLive | ConvertTo-Json\n",
    );
    Ok(script)
}

fn render_create(rec: &Record) -> Result<String> {
    check_record(rec)?;
    let type_args = match rec.record_type {
        RecordType::A => format!("-A -IPv4Address {}", rec.value),
        RecordType::Cname => format!("-CName -HostNameAlias {}", rec.value),
    };
    Ok(format!(
        "Add-DnsServerResourceRecord -ZoneName {} -Name {} {type_args} -TimeToLive (New-TimeSpan -Seconds {})\n",
        rec.zone, rec.name, rec.ttl
    ))
}

fn render_update(current: &Record, changes: &StagedChanges) -> Result<String> {
    check_record(current)?;
    if let Some(value) = &changes.new_value {
        check_field("new value", value)?;
    }

    let lookup = format!(
        "Get-DnsServerResourceRecord -ZoneName {zone} -Name {name} | ?{{$_.HostName -eq '{name}' -and $_.RecordData.{field} -eq '{value}'}}",
        zone = current.zone,
        name = current.name,
        field = value_field(current.record_type),
        value = current.value,
    );

    let mut script = format!("$old = {lookup}\n$new = {lookup}\n");
    if let Some(value) = &changes.new_value {
        match current.record_type {
            RecordType::A => {
                let _ = writeln!(
                    script,
                    "$new.RecordData.IPv4Address = [System.Net.IPAddress]::Parse('{value}')"
                );
            }
            RecordType::Cname => {
                let _ = writeln!(script, "$new.RecordData.HostNameAlias = '{value}'");
            }
        }
    }
    if let Some(ttl) = changes.new_ttl.filter(|t| *t != 0) {
        let _ = writeln!(script, "$new.TimeToLive = New-TimeSpan -Seconds {ttl}");
    }
    let _ = writeln!(
        script,
        "Set-DnsServerResourceRecord -ZoneName {} -NewInputObject $new -OldInputObject $old",
        current.zone
    );
    Ok(script)
}

fn render_delete(rec: &Record) -> Result<String> {
    check_record(rec)?;
    Ok(format!(
        "(Get-DnsServerResourceRecord -ZoneName {zone} -Name {name}) | ?{{$_.HostName -eq '{name}' -and $_.RecordData.{field} -eq '{value}'}} | Remove-DnsServerResourceRecord -ZoneName {zone} -Force\n",
        zone = rec.zone,
        name = rec.name,
        field = value_field(rec.record_type),
        value = rec.value,
    ))
}

/// Property of `RecordData` holding the record value.
fn value_field(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::A => "IPv4Address",
        RecordType::Cname => "HostNameAlias",
    }
}

// ============ Input validation ============

fn check_record(rec: &Record) -> Result<()> {
    check_field("zone", &rec.zone)?;
    check_field("name", &rec.name)?;
    check_field("value", &rec.value)
}

fn check_field(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DnsError::template(format!("{field} must not be empty")));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(DnsError::template(format!(
            "{field} '{}' contains forbidden character {c:?}",
            value.escape_debug()
        )));
    }
    Ok(())
}

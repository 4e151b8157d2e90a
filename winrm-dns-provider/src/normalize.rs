//! Decoding of `Get-DnsServerResourceRecord | ConvertTo-Json` output.
//!
//! `ConvertTo-Json` emits a bare object for one record and an array for many,
//! and flattens `RecordData.CimInstanceProperties` into either a single string
//! or a list of strings such as `IPv4Address = "10.0.0.1"`.

use serde::Deserialize;

use crate::error::{DnsError, Result};
use crate::types::{Record, RecordType};
use crate::utils::log_sanitizer::truncate_for_log;

/// One JSON value or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(Box<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![*item],
        }
    }
}

/// Projection selected by the query script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RemoteRecord {
    #[serde(default)]
    #[allow(dead_code)]
    pub distinguished_name: Option<String>,
    pub host_name: String,
    #[serde(default)]
    pub record_data: Option<RemoteRecordData>,
    pub record_type: String,
    pub time_to_live: RemoteTimeToLive,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteRecordData {
    #[serde(rename = "CimInstanceProperties", default)]
    pub cim_instance_properties: Option<CimProperties>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteTimeToLive {
    #[serde(rename = "TotalSeconds")]
    pub total_seconds: f64,
}

/// Shapes `CimInstanceProperties` takes depending on how many properties the
/// remote object exposes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CimProperties {
    Single(String),
    Multi(Vec<String>),
    Unrecognized(serde_json::Value),
}

impl CimProperties {
    /// The first property's quoted value, e.g. `10.0.0.1` out of `IPv4Address = "10.0.0.1"`.
    fn first_value(&self) -> Option<&str> {
        let first = match self {
            Self::Single(s) => s.as_str(),
            Self::Multi(items) => items.first()?.as_str(),
            Self::Unrecognized(_) => return None,
        };
        quoted_value(first)
    }
}

/// Text between the first pair of double quotes, or everything after an
/// unmatched opening quote.
fn quoted_value(property: &str) -> Option<&str> {
    let (_, rest) = property.split_once('"')?;
    Some(rest.split_once('"').map_or(rest, |(value, _)| value))
}

/// Parses raw query output into records of `zone`, each with a derived ID.
///
/// Empty output means the query matched nothing and yields `NotFound`, not an
/// empty list. Entries that cannot be interpreted are skipped.
pub fn normalize(stdout: &str, zone: &str) -> Result<Vec<Record>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(DnsError::not_found(format!("{zone}: no record found")));
    }

    let payload: OneOrMany<RemoteRecord> = serde_json::from_str(trimmed).map_err(|e| {
        log::error!("Failed to decode record listing: {e}");
        log::error!("Raw output: {}", truncate_for_log(trimmed));
        DnsError::parse(e)
    })?;

    Ok(payload
        .into_vec()
        .into_iter()
        .filter_map(|remote| convert(remote, zone))
        .collect())
}

fn convert(remote: RemoteRecord, zone: &str) -> Option<Record> {
    let Ok(record_type) = remote.record_type.parse::<RecordType>() else {
        log::warn!(
            "Skipping {} record '{}': unsupported type",
            remote.record_type,
            remote.host_name
        );
        return None;
    };

    let Some(value) = remote
        .record_data
        .as_ref()
        .and_then(|data| data.cim_instance_properties.as_ref())
        .and_then(CimProperties::first_value)
    else {
        log::warn!(
            "Skipping record '{}': unrecognized RecordData shape",
            remote.host_name
        );
        return None;
    };

    Some(
        Record::new(
            zone,
            remote.host_name,
            record_type,
            value,
            seconds_to_ttl(remote.time_to_live.total_seconds),
        )
        .with_derived_id(),
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_to_ttl(total_seconds: f64) -> u32 {
    total_seconds.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

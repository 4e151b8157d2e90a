use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DnsError;

// ============ Record Type ============

/// DNS record kinds this crate manages.
///
/// Only A and CNAME are supported; anything else is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// Canonical name (alias) record.
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    /// Uppercase wire name as used by the `DnsServer` `PowerShell` module.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "CNAME" => Ok(Self::Cname),
            _ => Err(DnsError::template(format!("unsupported record type: {s}"))),
        }
    }
}

// ============ Record ID ============

/// Composite record identifier `zone|name|value`.
///
/// Records are not unique by zone and name alone, so the value is part of the
/// identity. This is the only identifier persisted by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId {
    zone: String,
    name: String,
    value: String,
}

impl RecordId {
    pub fn new(zone: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.zone, self.name, self.value)
    }
}

impl FromStr for RecordId {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('|').collect();
        match parts.as_slice() {
            [zone, name, value] => Ok(Self::new(*zone, *name, *value)),
            _ => Err(DnsError::InvalidId { id: s.to_string() }),
        }
    }
}

impl TryFrom<String> for RecordId {
    type Error = DnsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

// ============ Record ============

/// A single A or CNAME record in a Microsoft DNS zone.
///
/// `ttl` is always whole seconds. `id` is absent on records built from caller
/// input and always present on records returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Zone the record lives in (e.g. `test.local`).
    pub zone: String,
    /// Host name relative to the zone.
    pub name: String,
    /// Record kind.
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// IPv4 address (A) or alias target (CNAME).
    pub value: String,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Composite ID, derived from zone, name and value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
}

impl Record {
    /// Builds a record from caller input. The ID is left unset.
    pub fn new(
        zone: impl Into<String>,
        name: impl Into<String>,
        record_type: RecordType,
        value: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            zone: zone.into(),
            name: name.into(),
            record_type,
            value: value.into(),
            ttl,
            id: None,
        }
    }

    /// Computes the composite ID from the current zone, name and value.
    pub fn derive_id(&self) -> RecordId {
        RecordId::new(&self.zone, &self.name, &self.value)
    }

    /// Returns the stored ID, or the derived one when none is set.
    pub fn identity(&self) -> RecordId {
        self.id.clone().unwrap_or_else(|| self.derive_id())
    }

    /// Fully qualified name, `name.zone`.
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.name, self.zone)
    }

    /// Recomputes `id` from zone, name and value.
    #[must_use]
    pub(crate) fn with_derived_id(mut self) -> Self {
        self.id = Some(self.derive_id());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_parse_case_insensitive() {
        assert_eq!("a".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("CName".parse::<RecordType>().unwrap(), RecordType::Cname);
    }

    #[test]
    fn record_type_rejects_unsupported() {
        let err = "MX".parse::<RecordType>().unwrap_err();
        assert!(matches!(err, DnsError::Template { .. }), "{err:?}");
    }

    #[test]
    fn record_type_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&RecordType::Cname).unwrap(), "\"CNAME\"");
        let t: RecordType = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(t, RecordType::A);
    }

    #[test]
    fn id_is_pipe_joined_triple() {
        let rec = Record::new("test.local", "terraform", RecordType::A, "10.99.0.10", 3600);
        assert_eq!(rec.derive_id().to_string(), "test.local|terraform|10.99.0.10");
    }

    #[test]
    fn id_parse_requires_three_parts() {
        let id: RecordId = "test.local|www|10.0.0.1".parse().unwrap();
        assert_eq!(id.zone(), "test.local");
        assert_eq!(id.name(), "www");
        assert_eq!(id.value(), "10.0.0.1");

        for bad in ["", "test.local", "test.local|www", "a|b|c|d"] {
            let err = bad.parse::<RecordId>().unwrap_err();
            assert!(matches!(err, DnsError::InvalidId { .. }), "{bad}: {err:?}");
        }
    }

    #[test]
    fn id_serializes_as_string() {
        let id = RecordId::new("z", "n", "v");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"z|n|v\"");
        assert!(serde_json::from_str::<RecordId>("\"z|n\"").is_err());
    }

    #[test]
    fn identity_prefers_stored_id() {
        let mut rec = Record::new("z", "n", RecordType::A, "1.1.1.1", 60);
        assert_eq!(rec.identity().to_string(), "z|n|1.1.1.1");
        rec.id = Some(RecordId::new("z", "n", "2.2.2.2"));
        assert_eq!(rec.identity().to_string(), "z|n|2.2.2.2");
    }

    #[test]
    fn fqdn_joins_name_and_zone() {
        let rec = Record::new("test.local", "www", RecordType::Cname, "web.test.local.", 60);
        assert_eq!(rec.fqdn(), "www.test.local");
    }
}

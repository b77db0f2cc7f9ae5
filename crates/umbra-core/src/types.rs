//! Core domain types for the umbra discovery pipeline.
//!
//! A sweep produces one [`ScanSession`] holding a [`HostRecord`] per
//! reachable host; the audit stage attaches [`Finding`]s to each record.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UmbraError;

// ── Severity ──────────────────────────────────────────────────────

/// Severity scale shared by findings and change events.
///
/// Ordered: Info < Warning < High < Critical.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UmbraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(UmbraError::Config(format!("unknown severity: {other}"))),
        }
    }
}

// ── Findings ──────────────────────────────────────────────────────

/// A vulnerability observation produced by the audit stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl Finding {
    pub fn new(severity: Severity, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity,
            kind: kind.into(),
            description: description.into(),
        }
    }
}

// ── Host records ──────────────────────────────────────────────────

/// Per-host snapshot produced by one sweep.
///
/// Only reachable hosts get a record; unreachable addresses are dropped
/// by the scanner, not recorded as down. `open_ports` preserves the
/// candidate-list probe order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip: Ipv4Addr,
    pub reachable: bool,
    pub open_ports: Vec<u16>,
    pub protocol_hints: Vec<String>,
    pub os_family: Option<String>,
    pub vendor: Option<String>,
    pub raw_banner: Option<String>,
    pub findings: Vec<Finding>,
}

impl HostRecord {
    /// A freshly discovered host, before fingerprint/audit enrichment.
    pub fn discovered(ip: Ipv4Addr, open_ports: Vec<u16>, protocol_hints: Vec<String>) -> Self {
        Self {
            ip,
            reachable: true,
            open_ports,
            protocol_hints,
            os_family: None,
            vendor: None,
            raw_banner: None,
            findings: Vec::new(),
        }
    }

    /// First port in probe order, used for the raw banner grab.
    pub fn first_open_port(&self) -> Option<u16> {
        self.open_ports.first().copied()
    }
}

// ── Scan sessions ─────────────────────────────────────────────────

/// One execution of the discovery pipeline over a subnet.
///
/// Opened at sweep start, closed at sweep end; the unit of persistence
/// handed to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: Uuid,
    pub subnet_prefix: SubnetPrefix,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub host_records: Vec<HostRecord>,
}

impl ScanSession {
    pub fn open(subnet_prefix: SubnetPrefix) -> Self {
        Self {
            id: Uuid::new_v4(),
            subnet_prefix,
            start_time: Utc::now(),
            end_time: None,
            host_records: Vec::new(),
        }
    }

    pub fn close(&mut self) {
        self.end_time = Some(Utc::now());
    }
}

// ── Subnet prefixes ───────────────────────────────────────────────

/// A three-octet dotted prefix (e.g. "192.168.1") denoting the /24
/// range `prefix.1 ..= prefix.254`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetPrefix {
    net: Ipv4Net,
}

impl SubnetPrefix {
    /// The candidate host addresses of the range, `.1` through `.254`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        self.net.hosts()
    }

    /// The covered network in CIDR notation ("a.b.c.0/24").
    pub fn cidr(&self) -> Ipv4Net {
        self.net
    }
}

impl FromStr for SubnetPrefix {
    type Err = UmbraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| UmbraError::InvalidPrefix {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let octets: Vec<&str> = s.split('.').collect();
        if octets.len() != 3 {
            return Err(invalid("expected three dotted octets, e.g. 192.168.1"));
        }

        let mut parsed = [0u8; 3];
        for (slot, octet) in parsed.iter_mut().zip(&octets) {
            *slot = octet
                .parse::<u8>()
                .map_err(|_| invalid("octets must be decimal numbers in 0-255"))?;
        }

        let base = Ipv4Addr::new(parsed[0], parsed[1], parsed[2], 0);
        let net = Ipv4Net::new(base, 24).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self { net })
    }
}

impl TryFrom<String> for SubnetPrefix {
    type Error = UmbraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SubnetPrefix> for String {
    fn from(prefix: SubnetPrefix) -> Self {
        prefix.to_string()
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, _] = self.net.addr().octets();
        write!(f, "{a}.{b}.{c}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn finding_kind_serializes_as_type() {
        let finding = Finding::new(Severity::High, "Default Credentials", "test");
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"type\":\"Default Credentials\""));
    }

    #[test]
    fn host_record_serialization_roundtrip() {
        let record = HostRecord {
            ip: Ipv4Addr::new(10, 0, 1, 42),
            reachable: true,
            open_ports: vec![22, 80],
            protocol_hints: vec!["SSH".to_string(), "HTTP".to_string()],
            os_family: Some("Linux".to_string()),
            vendor: Some("Generic".to_string()),
            raw_banner: Some("SSH-2.0-OpenSSH_9.6".to_string()),
            findings: vec![Finding::new(
                Severity::Critical,
                "Insecure Protocol",
                "Telnet service detected",
            )],
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: HostRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ip, record.ip);
        assert_eq!(back.open_ports, record.open_ports);
        assert_eq!(back.findings, record.findings);
    }

    #[test]
    fn prefix_parses_and_iterates_254_hosts() {
        let prefix: SubnetPrefix = "192.168.1".parse().unwrap();
        let hosts: Vec<Ipv4Addr> = prefix.hosts().collect();
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 1, 254));
        assert_eq!(prefix.to_string(), "192.168.1");
    }

    #[test]
    fn prefix_rejects_malformed_input() {
        assert!("192.168".parse::<SubnetPrefix>().is_err());
        assert!("192.168.1.0".parse::<SubnetPrefix>().is_err());
        assert!("192.168.abc".parse::<SubnetPrefix>().is_err());
        assert!("192.168.999".parse::<SubnetPrefix>().is_err());
        assert!("".parse::<SubnetPrefix>().is_err());
    }

    #[test]
    fn session_open_and_close() {
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();
        let mut session = ScanSession::open(prefix);
        assert!(session.end_time.is_none());
        assert!(session.host_records.is_empty());

        session.close();
        assert!(session.end_time.is_some());
    }
}

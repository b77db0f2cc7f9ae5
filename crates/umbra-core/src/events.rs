//! Change events emitted by the state diff stage.
//!
//! An event describes a security-relevant difference between exactly two
//! snapshots of the same host: the current sweep's record and the single
//! most recent prior record the store holds for that address.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UmbraError;
use crate::types::Severity;

/// The kind of state change detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    NewAsset,
    PortOpened,
    PortClosed,
    OsMismatch,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewAsset => "NEW_ASSET",
            EventKind::PortOpened => "PORT_OPENED",
            EventKind::PortClosed => "PORT_CLOSED",
            EventKind::OsMismatch => "OS_MISMATCH",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UmbraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_ASSET" => Ok(EventKind::NewAsset),
            "PORT_OPENED" => Ok(EventKind::PortOpened),
            "PORT_CLOSED" => Ok(EventKind::PortClosed),
            "OS_MISMATCH" => Ok(EventKind::OsMismatch),
            other => Err(UmbraError::Config(format!("unknown event kind: {other}"))),
        }
    }
}

/// A detected change between two snapshots of the same host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub severity: Severity,
    pub ip: Ipv4Addr,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        kind: EventKind,
        severity: Severity,
        ip: Ipv4Addr,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            ip,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

//! Differential state analysis between consecutive host snapshots.
//!
//! Compares exactly two records: the current sweep's snapshot and the
//! single most recent prior record the store holds for that address,
//! never more history than that.

use std::collections::BTreeSet;

use umbra_core::events::{ChangeEvent, EventKind};
use umbra_core::types::{HostRecord, Severity};

/// Derive change events from a current snapshot and the optional most
/// recent prior one.
///
/// A first sighting yields exactly one NEW_ASSET event and nothing
/// else. Otherwise the port and OS rules are independent; those that
/// fire emit in the fixed order PORT_OPENED, PORT_CLOSED, OS_MISMATCH.
pub fn diff_host(current: &HostRecord, prior: Option<&HostRecord>) -> Vec<ChangeEvent> {
    let ip = current.ip;

    let Some(prior) = prior else {
        return vec![ChangeEvent::new(
            EventKind::NewAsset,
            Severity::Info,
            ip,
            format!("First time seeing device at {ip} on the network"),
        )];
    };

    let mut events = Vec::new();

    let current_ports: BTreeSet<u16> = current.open_ports.iter().copied().collect();
    let prior_ports: BTreeSet<u16> = prior.open_ports.iter().copied().collect();

    let opened: Vec<u16> = current_ports.difference(&prior_ports).copied().collect();
    if !opened.is_empty() {
        events.push(ChangeEvent::new(
            EventKind::PortOpened,
            Severity::Warning,
            ip,
            format!("New ports opened on {ip}: {opened:?}"),
        ));
    }

    let closed: Vec<u16> = prior_ports.difference(&current_ports).copied().collect();
    if !closed.is_empty() {
        events.push(ChangeEvent::new(
            EventKind::PortClosed,
            Severity::Info,
            ip,
            format!("Ports closed on {ip}: {closed:?}"),
        ));
    }

    if let (Some(prior_os), Some(current_os)) = (&prior.os_family, &current.os_family) {
        if prior_os != current_os {
            events.push(ChangeEvent::new(
                EventKind::OsMismatch,
                Severity::Critical,
                ip,
                format!(
                    "OS fingerprint changed from {prior_os} to {current_os}. \
                     Potential spoofing or MITM attack."
                ),
            ));
        }
    }

    events
}

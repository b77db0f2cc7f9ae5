//! Sweep orchestration: scan → enrich → diff → persist → alert.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use umbra_core::events::ChangeEvent;
use umbra_core::types::{HostRecord, ScanSession, Severity, SubnetPrefix};
use umbra_store::HistoryStore;

use crate::alert::AlertSink;
use crate::audit::VulnerabilityAuditor;
use crate::config::AgentConfig;
use crate::diff;
use crate::error::Result;
use crate::fingerprint::DeviceFingerprinter;
use crate::probe::Prober;
use crate::scanner::SubnetScanner;

/// The result of one sweep: the closed session plus all change events
/// it produced.
pub struct SweepOutcome {
    pub session: ScanSession,
    pub events: Vec<ChangeEvent>,
}

/// Wires the pipeline stages together for repeated sweeps.
pub struct SweepPipeline {
    scanner: SubnetScanner,
    fingerprinter: DeviceFingerprinter,
    auditor: VulnerabilityAuditor,
    store: HistoryStore,
    alerts: Arc<dyn AlertSink>,
}

impl SweepPipeline {
    pub fn new(
        config: &AgentConfig,
        prober: Arc<dyn Prober>,
        store: HistoryStore,
        alerts: Arc<dyn AlertSink>,
    ) -> Result<Self> {
        Ok(Self {
            scanner: SubnetScanner::new(prober.clone(), &config.sweep),
            fingerprinter: DeviceFingerprinter::new(prober),
            auditor: VulnerabilityAuditor::new(&config.audit)?,
            store,
            alerts,
        })
    }

    /// Execute one sweep over the given prefix.
    ///
    /// Alerts go out before persistence, so a store failure loses
    /// nothing already computed; the outcome carries the full in-memory
    /// results either way.
    pub async fn run(
        &self,
        prefix: SubnetPrefix,
        cancel: &CancellationToken,
    ) -> Result<SweepOutcome> {
        let mut session = ScanSession::open(prefix);
        tracing::info!(session_id = %session.id, subnet = %prefix, "Assessment session started");

        let discovered = self.scanner.sweep(prefix, cancel).await;

        let mut events = Vec::new();
        for mut record in discovered {
            self.enrich(&mut record).await;

            // Change detection needs the single most recent prior
            // snapshot; a store failure here skips it for this host only.
            let host_events = match self.store.latest_host(record.ip).await {
                Ok(prior) => diff::diff_host(&record, prior.as_ref()),
                Err(e) => {
                    tracing::error!(
                        ip = %record.ip,
                        error = %e,
                        "History lookup failed, skipping change detection for host"
                    );
                    Vec::new()
                }
            };

            self.raise_alerts(&record, &host_events).await;
            events.extend(host_events);
            session.host_records.push(record);
        }

        session.close();

        self.store.append_session(&session).await?;
        self.store.append_events(&events).await?;

        tracing::info!(
            session_id = %session.id,
            subnet = %prefix,
            hosts = session.host_records.len(),
            events = events.len(),
            "Assessment session complete"
        );

        Ok(SweepOutcome { session, events })
    }

    /// Fingerprint then audit one discovered host in place.
    async fn enrich(&self, record: &mut HostRecord) {
        let fingerprint = self
            .fingerprinter
            .analyze(record.ip, &record.open_ports)
            .await;
        record.os_family = Some(fingerprint.os_family);
        record.vendor = Some(fingerprint.vendor);
        record.raw_banner = fingerprint.raw_banner;

        record.findings = self.auditor.audit(record.ip, &record.open_ports).await;
        if !record.findings.is_empty() {
            tracing::warn!(
                ip = %record.ip,
                findings = record.findings.len(),
                "Vulnerabilities found on host"
            );
        }
    }

    /// Forward every WARNING-and-above finding and event for this host.
    /// Delivery failure is logged, never propagated.
    async fn raise_alerts(&self, record: &HostRecord, events: &[ChangeEvent]) {
        let mut severity = Severity::Warning;
        let mut messages = Vec::new();

        for finding in &record.findings {
            if finding.severity >= Severity::Warning {
                severity = severity.max(finding.severity);
                messages.push(format!("{}: {}", finding.kind, finding.description));
            }
        }
        for event in events {
            if event.severity >= Severity::Warning {
                severity = severity.max(event.severity);
                messages.push(format!("{}: {}", event.kind, event.description));
            }
        }

        if messages.is_empty() {
            return;
        }

        if let Err(e) = self.alerts.deliver(record.ip, severity, &messages).await {
            tracing::warn!(ip = %record.ip, error = %e, "Alert delivery failed");
        }
    }
}

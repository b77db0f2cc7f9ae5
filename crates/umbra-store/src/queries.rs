//! Read operations for the scan-history store.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use umbra_core::events::ChangeEvent;
use umbra_core::types::{Finding, HostRecord};

use crate::client::{HistoryStore, StoreError};

/// Lightweight session metadata for reporting surfaces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub session_uuid: String,
    pub subnet_prefix: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub host_count: u32,
}

/// Raw host row before JSON columns are decoded.
struct HostRow {
    ip: String,
    open_ports: String,
    protocol_hints: String,
    os_family: Option<String>,
    vendor: Option<String>,
    raw_banner: Option<String>,
    findings: String,
}

impl HistoryStore {
    /// The most recently appended record for an address, across all
    /// sessions. `Ok(None)` means the address has never been seen.
    pub async fn latest_host(&self, ip: Ipv4Addr) -> Result<Option<HostRecord>, StoreError> {
        let conn = self.conn.lock().await;

        let row = conn
            .query_row(
                "SELECT ip, open_ports, protocol_hints, os_family, vendor, raw_banner, findings
                 FROM host_records
                 WHERE ip = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![ip.to_string()],
                |row| {
                    Ok(HostRow {
                        ip: row.get(0)?,
                        open_ports: row.get(1)?,
                        protocol_hints: row.get(2)?,
                        os_family: row.get(3)?,
                        vendor: row.get(4)?,
                        raw_banner: row.get(5)?,
                        findings: row.get(6)?,
                    })
                },
            )
            .optional()?;

        row.map(decode_host_row).transpose()
    }

    /// The latest change events, newest first.
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<ChangeEvent>, StoreError> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT ip, event_type, severity, description, timestamp
             FROM change_events
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (ip, kind, severity, description, timestamp) = row?;
            events.push(ChangeEvent {
                kind: kind
                    .parse()
                    .map_err(|_| StoreError::Corrupt(format!("event kind {kind:?}")))?,
                severity: severity
                    .parse()
                    .map_err(|_| StoreError::Corrupt(format!("severity {severity:?}")))?,
                ip: parse_ip(&ip)?,
                description,
                timestamp: parse_timestamp(&timestamp)?,
            });
        }
        Ok(events)
    }

    /// Session metadata with per-session host counts, newest first.
    pub async fn session_summaries(&self, limit: u32) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT s.session_uuid, s.subnet_prefix, s.start_time, s.end_time,
                    (SELECT COUNT(*) FROM host_records h WHERE h.session_id = s.id)
             FROM scan_sessions s
             ORDER BY s.id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (session_uuid, subnet_prefix, start, end, host_count) = row?;
            summaries.push(SessionSummary {
                session_uuid,
                subnet_prefix,
                start_time: parse_timestamp(&start)?,
                end_time: end.as_deref().map(parse_timestamp).transpose()?,
                host_count: host_count as u32,
            });
        }
        Ok(summaries)
    }
}

fn decode_host_row(row: HostRow) -> Result<HostRecord, StoreError> {
    let open_ports: Vec<u16> = decode_json(&row.open_ports)?;
    let protocol_hints: Vec<String> = decode_json(&row.protocol_hints)?;
    let findings: Vec<Finding> = decode_json(&row.findings)?;

    Ok(HostRecord {
        ip: parse_ip(&row.ip)?,
        // Only reachable hosts are ever persisted.
        reachable: true,
        open_ports,
        protocol_hints,
        os_family: row.os_family,
        vendor: row.vendor,
        raw_banner: row.raw_banner,
        findings,
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_ip(raw: &str) -> Result<Ipv4Addr, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("address {raw:?}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::events::EventKind;
    use umbra_core::types::{ScanSession, Severity, SubnetPrefix};

    fn session_with_host(record: HostRecord) -> ScanSession {
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();
        let mut session = ScanSession::open(prefix);
        session.host_records.push(record);
        session.close();
        session
    }

    fn host(ip: &str, ports: Vec<u16>, os: Option<&str>) -> HostRecord {
        let mut record = HostRecord::discovered(ip.parse().unwrap(), ports, vec![]);
        record.os_family = os.map(String::from);
        record
    }

    #[tokio::test]
    async fn latest_host_returns_none_for_unknown_ip() {
        let store = HistoryStore::in_memory().unwrap();
        let found = store.latest_host("10.0.1.9".parse().unwrap()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn latest_host_returns_most_recent_record() {
        let store = HistoryStore::in_memory().unwrap();
        let ip: Ipv4Addr = "10.0.1.5".parse().unwrap();

        store
            .append_session(&session_with_host(host("10.0.1.5", vec![22], Some("Linux"))))
            .await
            .unwrap();
        store
            .append_session(&session_with_host(host(
                "10.0.1.5",
                vec![22, 443],
                Some("Ubuntu Linux"),
            )))
            .await
            .unwrap();

        let latest = store.latest_host(ip).await.unwrap().unwrap();
        assert_eq!(latest.open_ports, vec![22, 443]);
        assert_eq!(latest.os_family.as_deref(), Some("Ubuntu Linux"));
        assert!(latest.reachable);
    }

    #[tokio::test]
    async fn host_findings_round_trip() {
        let store = HistoryStore::in_memory().unwrap();
        let mut record = host("10.0.1.23", vec![23], None);
        record.findings.push(Finding::new(
            Severity::Critical,
            "Insecure Protocol",
            "Telnet service detected. Traffic is unencrypted.",
        ));

        store
            .append_session(&session_with_host(record))
            .await
            .unwrap();

        let latest = store
            .latest_host("10.0.1.23".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.findings.len(), 1);
        assert_eq!(latest.findings[0].severity, Severity::Critical);
        assert_eq!(latest.findings[0].kind, "Insecure Protocol");
    }

    #[tokio::test]
    async fn events_append_and_read_back_newest_first() {
        let store = HistoryStore::in_memory().unwrap();
        let ip: Ipv4Addr = "10.0.1.7".parse().unwrap();

        store
            .append_events(&[
                ChangeEvent::new(EventKind::NewAsset, Severity::Info, ip, "first sighting"),
                ChangeEvent::new(EventKind::PortOpened, Severity::Warning, ip, "port 23 opened"),
            ])
            .await
            .unwrap();

        let events = store.recent_events(10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::PortOpened);
        assert_eq!(events[1].kind, EventKind::NewAsset);
        assert_eq!(events[0].ip, ip);
    }

    #[tokio::test]
    async fn session_summaries_count_hosts() {
        let store = HistoryStore::in_memory().unwrap();
        let prefix: SubnetPrefix = "10.0.1".parse().unwrap();

        let mut session = ScanSession::open(prefix);
        session.host_records.push(host("10.0.1.1", vec![80], None));
        session.host_records.push(host("10.0.1.2", vec![], None));
        session.close();
        store.append_session(&session).await.unwrap();

        let summaries = store.session_summaries(5).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].host_count, 2);
        assert_eq!(summaries[0].subnet_prefix, "10.0.1");
        assert!(summaries[0].end_time.is_some());
    }
}

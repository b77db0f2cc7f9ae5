//! Write operations for the scan-history store.

use rusqlite::params;
use umbra_core::events::ChangeEvent;
use umbra_core::types::ScanSession;

use crate::client::{HistoryStore, StoreError};

impl HistoryStore {
    /// Append a closed scan session and all of its host records.
    ///
    /// The whole session is written in one transaction; a failure leaves
    /// the store unchanged. Returns the session's rowid.
    pub async fn append_session(&self, session: &ScanSession) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO scan_sessions (session_uuid, subnet_prefix, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.subnet_prefix.to_string(),
                session.start_time.to_rfc3339(),
                session.end_time.map(|t| t.to_rfc3339()),
            ],
        )?;
        let session_rowid = tx.last_insert_rowid();

        for record in &session.host_records {
            tx.execute(
                "INSERT INTO host_records
                   (session_id, ip, open_ports, protocol_hints,
                    os_family, vendor, raw_banner, findings)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session_rowid,
                    record.ip.to_string(),
                    encode_json(&record.open_ports)?,
                    encode_json(&record.protocol_hints)?,
                    record.os_family,
                    record.vendor,
                    record.raw_banner,
                    encode_json(&record.findings)?,
                ],
            )?;
        }

        tx.commit()?;

        tracing::debug!(
            session_id = %session.id,
            hosts = session.host_records.len(),
            "Session appended to history store"
        );
        Ok(session_rowid)
    }

    /// Append a batch of change events.
    pub async fn append_events(&self, events: &[ChangeEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for event in events {
            tx.execute(
                "INSERT INTO change_events (ip, event_type, severity, description, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.ip.to_string(),
                    event.kind.as_str(),
                    event.severity.as_str(),
                    event.description,
                    event.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

//! Table definitions for the scan-history database.

use rusqlite::Connection;

/// List-valued host fields (ports, hints, findings) are stored as JSON
/// text; `host_records.id` provides the recency ordering the diff stage
/// relies on.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scan_sessions (
    id            INTEGER PRIMARY KEY,
    session_uuid  TEXT NOT NULL UNIQUE,
    subnet_prefix TEXT NOT NULL,
    start_time    TEXT NOT NULL,
    end_time      TEXT
);

CREATE TABLE IF NOT EXISTS host_records (
    id             INTEGER PRIMARY KEY,
    session_id     INTEGER NOT NULL REFERENCES scan_sessions(id),
    ip             TEXT NOT NULL,
    open_ports     TEXT NOT NULL,
    protocol_hints TEXT NOT NULL,
    os_family      TEXT,
    vendor         TEXT,
    raw_banner     TEXT,
    findings       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_host_records_ip ON host_records(ip);

CREATE TABLE IF NOT EXISTS change_events (
    id          INTEGER PRIMARY KEY,
    ip          TEXT NOT NULL,
    event_type  TEXT NOT NULL,
    severity    TEXT NOT NULL,
    description TEXT NOT NULL,
    timestamp   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_events_ip ON change_events(ip);
";

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

//! umbra-store: SQLite client for the scan-history store.
//!
//! This crate is the single persistence point for sweep output. All reads
//! and writes of sessions, host snapshots, and change events flow through
//! [`HistoryStore`] so the diff stage's "most recent prior record" query
//! has one consistent definition: highest insertion order wins.

pub mod client;
pub mod mutations;
pub mod queries;
mod schema;

pub use client::{HistoryStore, StoreError};
pub use queries::SessionSummary;

//! umbra-core: Shared domain types for the umbra network agent.
//!
//! This crate provides the types that flow through the discovery pipeline
//! and into storage:
//! - Per-sweep snapshots (ScanSession, HostRecord) and audit findings
//! - Change events emitted by the state diff stage
//! - Subnet prefix parsing for /24 sweep targets
//! - Common error types

pub mod error;
pub mod events;
pub mod types;

pub use error::UmbraError;

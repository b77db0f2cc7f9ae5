//! Error types for the umbra-scan crate.
//!
//! Transient network outcomes (timeout, refused, unreachable) are not
//! errors anywhere in this crate; they are represented as absence. The
//! variants here cover genuinely exceptional conditions only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid sweep target: {0}")]
    Target(#[from] umbra_core::UmbraError),

    #[error("Store error: {0}")]
    Store(#[from] umbra_store::StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

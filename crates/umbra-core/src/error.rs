use thiserror::Error;

/// Top-level error type shared across umbra crates.
#[derive(Error, Debug)]
pub enum UmbraError {
    #[error("Invalid subnet prefix {input:?}: {reason}")]
    InvalidPrefix { input: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error types for the medtrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medtrack_core operations
///
/// An absent price is deliberately not represented here: it is a valid
/// record state that projects to zero cost.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before it reached the store (e.g. empty generic name)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A medicine with this generic name already exists
    #[error("Medicine '{name}' already exists")]
    DuplicateKey { name: String },

    /// Update or delete referenced a record that does not exist
    #[error("Medicine not found: {0}")]
    NotFound(String),
}

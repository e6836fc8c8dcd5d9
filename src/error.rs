//! Error type shared by the configuration, dataset and checkpoint layers.
//!
//! The numerical code (layers, optimizer) does not return errors: buffer size
//! violations there are bugs and trip assertions instead.

use thiserror::Error;

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is missing or out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Feature/label matrices disagree on row or column counts.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A checkpoint could not be written, read or applied to the model.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The global tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

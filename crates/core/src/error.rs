//! Error types for the cross-venue analysis engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the analysis engine.
///
/// Only data-source level failures (`Upstream`, `Json`) and bad configuration
/// abort a run. Per-instrument and per-pair problems are recorded in the
/// result rows instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or missing data from the external query layer.
    #[error("Upstream data error: {0}")]
    Upstream(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Instrument identifier matched neither naming grammar.
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an upstream data error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::Upstream(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Whether this error should abort the whole analysis run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Upstream(_) | Error::Json(_))
    }
}

//! Error types for climate-drought crates.

use thiserror::Error;

/// Result type alias using DroughtError.
pub type DroughtResult<T> = Result<T, DroughtError>;

/// Primary error type for drought-index operations.
///
/// Missing data is never an error: the aligner and resolver encode gaps as
/// sentinel values and an empty analysis window yields an empty series.
#[derive(Debug, Error)]
pub enum DroughtError {
    /// Malformed region (degenerate polygon, inverted bounding box, bad coordinate).
    #[error("invalid region: {0}")]
    Region(String),

    /// Operation invoked out of lifecycle order, e.g. process before download.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Unknown product name requested from the registry.
    #[error("unknown product: {0}")]
    Lookup(String),

    /// Acquisition of source data failed.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Artifact store read/write failure.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DroughtError {
    /// Create a Region error.
    pub fn region(msg: impl Into<String>) -> Self {
        Self::Region(msg.into())
    }

    /// Create a Precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a Lookup error.
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create an Acquisition error.
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    /// Create an Artifact error.
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<std::io::Error> for DroughtError {
    fn from(err: std::io::Error) -> Self {
        Self::Artifact(err.to_string())
    }
}

impl From<serde_json::Error> for DroughtError {
    fn from(err: serde_json::Error) -> Self {
        Self::Artifact(format!("JSON error: {}", err))
    }
}

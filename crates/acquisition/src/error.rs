//! Acquisition error conditions.

use std::path::PathBuf;

use drought_common::DroughtError;
use thiserror::Error;

/// Errors raised while acquiring source data.
///
/// The conditions are kept distinct so callers can decide retry policy per
/// failure class; the core never retries beyond the download client's own
/// bounded backoff.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Remote endpoint unreachable or returned a server error.
    #[error("network error: {0}")]
    Network(String),

    /// Remote endpoint rejected the request credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// A required pre-computed input file is absent.
    #[error("missing input file: {}", .0.display())]
    MissingFile(PathBuf),

    /// A source file could not be decoded into a series.
    #[error("decode error: {0}")]
    Decode(String),

    /// Local filesystem failure while caching.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AcquisitionError> for DroughtError {
    fn from(err: AcquisitionError) -> Self {
        DroughtError::Acquisition(err.to_string())
    }
}

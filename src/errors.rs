use std::io;

use thiserror::Error;

/// The record collection could not be obtained or parsed. Terminal for the
/// load attempt: the caller shows a failure state and never runs the
/// pipeline.
#[derive(Debug, Error)]
pub enum SourceLoadError {
    #[error("failed to read update data from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("update data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("update data must be a JSON array of records, found {found}")]
    NotAnArray { found: &'static str },
}

/// The render surface rejected an append, usually because its mount point
/// no longer exists.
#[derive(Debug, Error)]
#[error("render target unavailable: {reason}")]
pub struct TargetUnavailable {
    pub reason: String,
}

impl TargetUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A record's date key is neither `YYYY-MM-DD` nor an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed date key '{raw}'")]
pub struct DateKeyError {
    pub raw: String,
}

//! Error types for contact reconciliation
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// A call to the remote directory failed (transient network error)
    #[error("Remote directory error: {0}")]
    Remote(String),

    /// More than one remote candidate scored equally highest
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// A local record cannot be matched or converted
    #[error("Validation error: {0}")]
    Validation(String),

    /// A field was changed on both sides in the same run
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Local contact store or sync record store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another sync run is already in progress on this engine
    #[error("Sync already in progress")]
    SyncInProgress,

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a remote directory error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create an ambiguous match error
    pub fn ambiguous_match(msg: impl Into<String>) -> Self {
        Self::AmbiguousMatch(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Map this error onto the issue taxonomy reported in a [`SyncContext`]
    ///
    /// [`SyncContext`]: crate::engine::SyncContext
    pub fn issue_kind(&self) -> crate::engine::IssueKind {
        use crate::engine::IssueKind;

        match self {
            Error::Remote(_) => IssueKind::TransientNetwork,
            Error::AmbiguousMatch(_) => IssueKind::AmbiguousMatch,
            Error::Validation(_) => IssueKind::Validation,
            Error::Conflict(_) => IssueKind::Conflict,
            Error::Store(_) | Error::Io(_) | Error::Json(_) | Error::NotFound(_) => {
                IssueKind::Store
            }
            Error::Config(_) | Error::SyncInProgress | Error::Other(_) => IssueKind::Other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IssueKind;

    #[test]
    fn test_issue_kind_mapping() {
        assert_eq!(Error::remote("timeout").issue_kind(), IssueKind::TransientNetwork);
        assert_eq!(Error::validation("no name").issue_kind(), IssueKind::Validation);
        assert_eq!(Error::store("disk full").issue_kind(), IssueKind::Store);
        assert_eq!(Error::SyncInProgress.issue_kind(), IssueKind::Other);
    }
}

//! Error taxonomy for a sync run.
//!
//! [`SyncError::WriteAccess`] and [`SyncError::Workspace`] abort the whole run.
//! Every other variant is scoped to a single repository: the orchestrator
//! logs it and moves on to the next one.

use std::path::PathBuf;
use thiserror::Error;

/// Underlying cause of a transfer failure (HTTP client, I/O, timer)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Every candidate branch answered 404
    #[error("{repository} could not be downloaded from any branch ({})", branches.join(", "))]
    NotFound {
        repository: String,
        branches: Vec<String>,
    },

    /// Network, HTTP or VCS failure other than a missing branch
    #[error(
        "transfer of {repository} failed: {message}{}",
        source.as_ref().map(|e| format!(": {}", e)).unwrap_or_default()
    )]
    Transfer {
        repository: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("malformed archive {}: {reason}", path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("target directory {} is not writable: {source}", path.display())]
    WriteAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install into {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

impl SyncError {
    /// Whether this error stops the run instead of a single repository
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::WriteAccess { .. } | SyncError::Workspace(_))
    }

    pub(crate) fn transfer(repository: &str, message: impl Into<String>) -> Self {
        SyncError::Transfer {
            repository: repository.to_string(),
            message: message.into(),
            source: None,
        }
    }

    /// Transfer failure that keeps the error that caused it
    pub(crate) fn transfer_caused_by(
        repository: &str,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        SyncError::Transfer {
            repository: repository.to_string(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyncError::MalformedArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

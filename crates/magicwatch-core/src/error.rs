//! Error types for watching and scanning.
//!
//! Every variant is recoverable. The polling loop catches all of them at
//! the cycle boundary; which variant it gets only decides how long it
//! waits before trying again.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that can fail while watching.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Things that can go wrong during one polling cycle.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The watched path doesn't exist at listing time.
    #[error("directory not found: '{0}'")]
    DirectoryNotFound(PathBuf),

    /// The path exists but couldn't be listed (permissions, not a directory).
    #[error("failed to list directory '{path}': {source}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tracked file couldn't be opened or read this cycle.
    #[error("failed to read file '{path}': {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Anything else that broke a cycle.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse classification, used for log fields and backoff decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DirectoryNotFound,
    DirectoryAccess,
    FileAccess,
    Unexpected,
}

impl WatchError {
    /// Classifies a directory listing failure.
    ///
    /// `NotFound` becomes [`WatchError::DirectoryNotFound`], everything
    /// else is an access problem.
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::DirectoryNotFound(path)
        } else {
            Self::DirectoryAccess { path, source }
        }
    }

    /// Creates a file access error with the path for context.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DirectoryNotFound(_) => ErrorKind::DirectoryNotFound,
            Self::DirectoryAccess { .. } => ErrorKind::DirectoryAccess,
            Self::FileAccess { .. } => ErrorKind::FileAccess,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// True when the loop should back off for the grace period.
    pub fn is_directory_not_found(&self) -> bool {
        self.kind() == ErrorKind::DirectoryNotFound
    }
}

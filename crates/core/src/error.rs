// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File operation errors
//!
//! Every variant that concerns a single file carries the offending path so
//! that callers can report it without extra context.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by file operations, locks and the poll cycle
#[derive(Debug, Error)]
pub enum FileError {
    #[error("access denied to '{}': {source}", path.display())]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lock on '{}' is already held by this handle", path.display())]
    AlreadyLocked { path: PathBuf },

    #[error("could not lock file '{}' because it is already locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error(
        "could not lock file '{}' because it remained locked by another process for the {} timeout (waited {})",
        path.display(),
        fmt_duration(timeout),
        fmt_duration(waited)
    )]
    LockTimeout {
        path: PathBuf,
        timeout: Duration,
        waited: Duration,
    },

    #[error("file '{}' is still being written", path.display())]
    StillWriting { path: PathBuf },

    #[error("file '{}' was deleted while it was being read", path.display())]
    DeletedWhileReading { path: PathBuf },

    #[error("interrupted while waiting on '{}'", path.display())]
    WaitInterrupted { path: PathBuf },

    #[error("illegal path '{}': {reason}", path.display())]
    IllegalPath { path: PathBuf, reason: String },

    #[error("path '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("path '{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// Classify an OS error for the given path
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound { path },
            io::ErrorKind::PermissionDenied => FileError::AccessDenied { path, source: err },
            io::ErrorKind::AlreadyExists => FileError::AlreadyExists { path },
            _ => FileError::Io { path, source: err },
        }
    }

    pub fn illegal_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        FileError::IllegalPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The path this error concerns, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            FileError::AccessDenied { path, .. }
            | FileError::AlreadyLocked { path }
            | FileError::Locked { path }
            | FileError::LockTimeout { path, .. }
            | FileError::StillWriting { path }
            | FileError::DeletedWhileReading { path }
            | FileError::WaitInterrupted { path }
            | FileError::IllegalPath { path, .. }
            | FileError::NotFound { path }
            | FileError::AlreadyExists { path }
            | FileError::Io { path, .. } => Some(path),
            FileError::Connection(_) | FileError::InvalidConfiguration(_) => None,
        }
    }

    /// Whether the file is held by another party (busy rather than broken)
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, FileError::Locked { .. } | FileError::LockTimeout { .. })
    }

    /// Recover a `FileError` that was carried through an `io::Error`
    pub fn from_carried(err: io::Error) -> Result<FileError, io::Error> {
        if err.get_ref().is_some_and(|inner| inner.is::<FileError>()) {
            match err.into_inner().map(|inner| inner.downcast::<FileError>()) {
                Some(Ok(file_err)) => Ok(*file_err),
                Some(Err(other)) => Err(io::Error::other(other)),
                None => Err(io::Error::other("empty error")),
            }
        } else {
            Err(err)
        }
    }
}

impl From<FileError> for io::Error {
    fn from(err: FileError) -> Self {
        let kind = match &err {
            FileError::NotFound { .. } | FileError::DeletedWhileReading { .. } => {
                io::ErrorKind::NotFound
            }
            FileError::AccessDenied { .. } => io::ErrorKind::PermissionDenied,
            FileError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            FileError::LockTimeout { .. } => io::ErrorKind::TimedOut,
            FileError::WaitInterrupted { .. } => io::ErrorKind::Interrupted,
            FileError::Locked { .. } | FileError::AlreadyLocked { .. } => io::ErrorKind::WouldBlock,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Render a duration the way it is written in configuration files
pub fn fmt_duration(duration: &Duration) -> String {
    humantime::format_duration(*duration).to_string()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

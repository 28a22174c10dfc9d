// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time filesystem metadata

use crate::error::FileError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Immutable snapshot of a path's attributes, re-created on every read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSnapshot {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub is_directory: bool,
    pub is_regular_file: bool,
    pub is_symlink: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

impl PathSnapshot {
    /// Build a snapshot from already-fetched metadata
    ///
    /// `target` is the metadata of the symlink target, `None` when the link
    /// dangles. For non-links it is the same metadata as `link`.
    pub fn from_metadata(path: &Path, link: &Metadata, target: Option<&Metadata>) -> Self {
        let effective = target.unwrap_or(link);
        let modified_at = to_utc(effective.modified().ok()).unwrap_or(DateTime::UNIX_EPOCH);
        let created_at = to_utc(effective.created().ok()).unwrap_or(modified_at);
        let accessed_at = to_utc(effective.accessed().ok()).unwrap_or(modified_at);

        Self {
            path: path.to_path_buf(),
            name: file_name(path),
            size: target.map(Metadata::len).unwrap_or(0),
            is_directory: target.is_some_and(Metadata::is_dir),
            is_regular_file: target.is_some_and(Metadata::is_file),
            is_symlink: link.file_type().is_symlink(),
            created_at,
            modified_at,
            accessed_at,
        }
    }

    /// A symlink whose target is neither a file nor a directory
    pub fn is_other(&self) -> bool {
        !self.is_directory && !self.is_regular_file
    }
}

/// Produces snapshots for paths
pub trait AttributeReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<PathSnapshot, FileError>;
}

impl<R: AttributeReader + ?Sized> AttributeReader for &R {
    fn read(&self, path: &Path) -> Result<PathSnapshot, FileError> {
        (**self).read(path)
    }
}

/// Reads attributes from the local filesystem, following symlinks
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAttributeReader;

impl AttributeReader for LocalAttributeReader {
    fn read(&self, path: &Path) -> Result<PathSnapshot, FileError> {
        let link = std::fs::symlink_metadata(path).map_err(|e| FileError::from_io(path, e))?;
        if !link.file_type().is_symlink() {
            return Ok(PathSnapshot::from_metadata(path, &link, Some(&link)));
        }

        match std::fs::metadata(path) {
            Ok(target) => Ok(PathSnapshot::from_metadata(path, &link, Some(&target))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(PathSnapshot::from_metadata(path, &link, None))
            }
            Err(e) => Err(FileError::from_io(path, e)),
        }
    }
}

fn to_utc(time: Option<SystemTime>) -> Option<DateTime<Utc>> {
    time.map(DateTime::<Utc>::from)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "attributes_tests.rs"]
mod tests;

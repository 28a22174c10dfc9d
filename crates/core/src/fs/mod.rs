// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local filesystem connection and operations
//!
//! A [`LocalFileSystem`] is a handle rooted at a working directory. Relative
//! paths given to any operation resolve against that directory.

mod manage;
mod read;
mod transfer;
mod write;

pub use read::{acquire_guard, LockMode, ReadOptions};
pub use transfer::TransferOptions;
pub use write::{WriteMode, WriteOptions};

use crate::attributes::{AttributeReader, LocalAttributeReader};
use crate::error::FileError;
use crate::matcher::Matcher;
use crate::subset::SubsetSpec;
use crate::walker::{DirectoryWalker, Listing};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Handle on the local filesystem rooted at a base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileSystem {
    base_path: PathBuf,
}

impl LocalFileSystem {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute, lexically normalised form of `path`
    ///
    /// `.` and `..` are folded without touching the disk. A path that climbs
    /// above the filesystem root or contains NUL is illegal.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf, FileError> {
        if path.as_os_str().to_string_lossy().contains('\0') {
            return Err(FileError::illegal_path(path, "path contains a NUL character"));
        }
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        };

        let mut normalised = PathBuf::new();
        let mut depth = 0usize;
        for component in joined.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => normalised.push(component),
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(FileError::illegal_path(
                            path,
                            "path escapes the filesystem root",
                        ));
                    }
                    normalised.pop();
                    depth -= 1;
                }
                Component::Normal(part) => {
                    normalised.push(part);
                    depth += 1;
                }
            }
        }
        Ok(normalised)
    }

    /// Like [`resolve_path`](Self::resolve_path) but the path must exist
    pub fn resolve_existing_path(&self, path: &Path) -> Result<PathBuf, FileError> {
        let resolved = self.resolve_path(path)?;
        match std::fs::symlink_metadata(&resolved) {
            Ok(_) => Ok(resolved),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileError::illegal_path(resolved, "path does not exist"))
            }
            Err(e) => Err(FileError::from_io(resolved, e)),
        }
    }

    /// List `directory`, filtered by `matcher`, optionally sorted and paged
    pub fn list(
        &self,
        directory: &Path,
        recursive: bool,
        matcher: &Matcher,
        subset: Option<&SubsetSpec>,
    ) -> Result<Vec<Listing>, FileError> {
        let root = self.resolve_existing_path(directory)?;
        let reader = LocalAttributeReader;
        if !reader.read(&root)?.is_directory {
            return Err(FileError::illegal_path(root, "path is not a directory"));
        }

        let listings: Vec<Listing> = DirectoryWalker::new(&reader, matcher, recursive)
            .walk(&root)?
            .collect();
        debug!(path = %root.display(), count = listings.len(), "listed directory");

        Ok(match subset {
            Some(spec) => spec.apply(listings),
            None => listings,
        })
    }
}

/// Source of filesystem handles
///
/// A new connection per poll is acceptable; `disconnect` gives a handle back.
pub trait ConnectionProvider: Send + Sync {
    fn connect(&self) -> Result<LocalFileSystem, FileError>;

    fn disconnect(&self, _fs: LocalFileSystem) {}
}

/// Connects to a working directory, the user's home by default
#[derive(Debug, Clone)]
pub struct LocalConnectionProvider {
    working_dir: Option<PathBuf>,
}

impl LocalConnectionProvider {
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self { working_dir }
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.working_dir.clone().or_else(dirs::home_dir)
    }
}

impl ConnectionProvider for LocalConnectionProvider {
    fn connect(&self) -> Result<LocalFileSystem, FileError> {
        let dir = self.working_dir().ok_or_else(|| {
            FileError::Connection("no working directory configured and no home directory".into())
        })?;
        match std::fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(LocalFileSystem::new(dir)),
            Ok(_) => Err(FileError::Connection(format!(
                "working directory '{}' is not a directory",
                dir.display()
            ))),
            Err(e) => Err(FileError::Connection(format!(
                "working directory '{}' is not accessible: {e}",
                dir.display()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;

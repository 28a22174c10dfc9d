// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::LocalFileSystem;
use crate::error::FileError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub overwrite: bool,
    pub create_parent_dirs: bool,
    pub rename_to: Option<String>,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn create_parent_dirs(mut self, create: bool) -> Self {
        self.create_parent_dirs = create;
        self
    }

    pub fn rename_to(mut self, name: impl Into<String>) -> Self {
        self.rename_to = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Copy,
    Move,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Copy => "copy",
            Action::Move => "move",
        }
    }
}

impl LocalFileSystem {
    /// Copy a file or directory tree; returns the destination path
    pub fn copy(
        &self,
        source: &Path,
        target: &Path,
        options: &TransferOptions,
    ) -> Result<PathBuf, FileError> {
        self.transfer(source, target, options, Action::Copy)
    }

    /// Move a file or directory tree; returns the destination path
    pub fn move_path(
        &self,
        source: &Path,
        target: &Path,
        options: &TransferOptions,
    ) -> Result<PathBuf, FileError> {
        self.transfer(source, target, options, Action::Move)
    }

    fn transfer(
        &self,
        source: &Path,
        target: &Path,
        options: &TransferOptions,
        action: Action,
    ) -> Result<PathBuf, FileError> {
        let source = self.resolve_existing_path(source)?;
        let target = self.resolve_path(target)?;
        let name = match options.rename_to.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => validate_name(&source, name)?,
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| FileError::illegal_path(&source, "path has no file name"))?,
        };

        let destination = destination(&source, &target, &name, options, action)?;
        if same_path(&source, &destination) {
            return match action {
                Action::Move => {
                    debug!(path = %source.display(), "move onto itself, nothing to do");
                    Ok(destination)
                }
                Action::Copy => Err(FileError::AlreadyExists { path: destination }),
            };
        }
        if destination.starts_with(&source) && source.is_dir() {
            return Err(FileError::illegal_path(
                destination,
                format!("cannot {} a directory into itself", action.verb()),
            ));
        }
        if destination.exists() {
            if !options.overwrite {
                return Err(FileError::AlreadyExists { path: destination });
            }
            remove_any(&destination)?;
        }

        let source_is_dir = std::fs::metadata(&source)
            .map_err(|e| FileError::from_io(&source, e))?
            .is_dir();
        match action {
            Action::Copy if source_is_dir => copy_tree(&source, &destination)?,
            Action::Copy => {
                std::fs::copy(&source, &destination).map_err(|e| FileError::from_io(&source, e))?;
            }
            Action::Move => {
                if let Err(e) = std::fs::rename(&source, &destination) {
                    debug!(error = %e, "rename failed, falling back to copy and delete");
                    if source_is_dir {
                        copy_tree(&source, &destination)?;
                    } else {
                        std::fs::copy(&source, &destination)
                            .map_err(|e| FileError::from_io(&source, e))?;
                    }
                    remove_any(&source)?;
                }
            }
        }

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "{} complete",
            action.verb()
        );
        Ok(destination)
    }
}

/// Where `source` lands given the requested target
///
/// An existing directory receives the source inside it. A missing target is
/// created as a directory when allowed. An existing file is replaced only
/// with `overwrite`.
fn destination(
    source: &Path,
    target: &Path,
    name: &str,
    options: &TransferOptions,
    action: Action,
) -> Result<PathBuf, FileError> {
    match std::fs::metadata(target) {
        Ok(meta) if meta.is_dir() => {
            let same_dir_name = source.is_dir() && source.file_name() == target.file_name();
            if same_dir_name && !options.overwrite {
                return Err(FileError::AlreadyExists {
                    path: target.to_path_buf(),
                });
            }
            Ok(target.join(name))
        }
        Ok(_) if options.overwrite => Ok(target.to_path_buf()),
        Ok(_) => Err(FileError::AlreadyExists {
            path: target.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !options.create_parent_dirs {
                return Err(FileError::illegal_path(
                    target,
                    format!(
                        "cannot {} '{}' because the destination does not exist",
                        action.verb(),
                        source.display()
                    ),
                ));
            }
            std::fs::create_dir_all(target).map_err(|e| FileError::from_io(target, e))?;
            Ok(target.join(name))
        }
        Err(e) => Err(FileError::from_io(target, e)),
    }
}

/// A bare file name: non-empty, no separators, not `.` or `..`
pub(super) fn validate_name(path: &Path, name: &str) -> Result<String, FileError> {
    let bare = Path::new(name).file_name().is_some_and(|n| n == name);
    if !bare || name.contains('/') || name.contains('\\') {
        return Err(FileError::illegal_path(
            path,
            format!("'{name}' is not a valid file name"),
        ));
    }
    Ok(name.to_string())
}

/// Whether two resolved paths name the same entry
///
/// Existing paths are compared by their canonical form so that symlinked
/// parents do not hide an alias.
pub(super) fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub(super) fn remove_any(path: &Path) -> Result<(), FileError> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| FileError::from_io(path, e))?;
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FileError::from_io(path, e))
}

/// Copy a directory tree using an explicit work stack
fn copy_tree(source: &Path, destination: &Path) -> Result<(), FileError> {
    let mut stack = vec![(source.to_path_buf(), destination.to_path_buf())];
    while let Some((from, to)) = stack.pop() {
        std::fs::create_dir_all(&to).map_err(|e| FileError::from_io(&to, e))?;
        let entries = std::fs::read_dir(&from).map_err(|e| FileError::from_io(&from, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| FileError::from_io(&from, e))?;
            let target = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .map_err(|e| FileError::from_io(entry.path(), e))?;
            if file_type.is_dir() {
                stack.push((entry.path(), target));
            } else {
                std::fs::copy(entry.path(), &target)
                    .map_err(|e| FileError::from_io(entry.path(), e))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::transfer::{remove_any, same_path, validate_name};
use super::LocalFileSystem;
use crate::error::FileError;
use std::path::{Path, PathBuf};
use tracing::debug;

impl LocalFileSystem {
    /// Rename in place; `new_name` must be a bare file name
    pub fn rename(&self, path: &Path, new_name: &str, overwrite: bool) -> Result<PathBuf, FileError> {
        let source = self.resolve_existing_path(path)?;
        let name = validate_name(&source, new_name)?;
        let target = match source.parent() {
            Some(parent) => parent.join(name),
            None => return Err(FileError::illegal_path(&source, "cannot rename the root")),
        };

        if same_path(&source, &target) {
            debug!(path = %source.display(), "rename to the current name, nothing to do");
            return Ok(target);
        }
        if target.exists() {
            if !overwrite {
                return Err(FileError::AlreadyExists { path: target });
            }
            remove_any(&target)?;
        }
        std::fs::rename(&source, &target).map_err(|e| FileError::from_io(&source, e))?;
        debug!(source = %source.display(), target = %target.display(), "renamed");
        Ok(target)
    }

    /// Delete a file or a whole directory tree
    pub fn delete(&self, path: &Path) -> Result<(), FileError> {
        let resolved = self.resolve_existing_path(path)?;
        remove_any(&resolved)?;
        debug!(path = %resolved.display(), "deleted");
        Ok(())
    }

    /// Create a directory and any missing parents
    pub fn create_directory(&self, path: &Path) -> Result<PathBuf, FileError> {
        let resolved = self.resolve_path(path)?;
        if resolved.exists() {
            return Err(FileError::AlreadyExists { path: resolved });
        }
        std::fs::create_dir_all(&resolved).map_err(|e| FileError::from_io(&resolved, e))?;
        Ok(resolved)
    }
}

#[cfg(test)]
#[path = "manage_tests.rs"]
mod tests;

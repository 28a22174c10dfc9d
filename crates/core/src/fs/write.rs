// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::LocalFileSystem;
use crate::error::FileError;
use crate::lock::PathLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
    CreateNew,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub mode: WriteMode,
    pub lock: bool,
    pub create_parent_dirs: bool,
}

impl WriteOptions {
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn locked(mut self) -> Self {
        self.lock = true;
        self
    }

    pub fn create_parent_dirs(mut self) -> Self {
        self.create_parent_dirs = true;
        self
    }
}

impl LocalFileSystem {
    /// Write `content` to `path`; returns the number of bytes written
    ///
    /// With `lock`, an exclusive lock is held for the whole write and
    /// released on every exit path.
    pub fn write(
        &self,
        path: &Path,
        mut content: impl Read,
        options: &WriteOptions,
    ) -> Result<u64, FileError> {
        let resolved = self.resolve_path(path)?;

        match std::fs::metadata(&resolved) {
            Ok(meta) if meta.is_dir() => {
                return Err(FileError::illegal_path(
                    resolved,
                    "cannot write to a directory",
                ));
            }
            Ok(_) if options.mode == WriteMode::CreateNew => {
                return Err(FileError::AlreadyExists { path: resolved });
            }
            _ => {}
        }

        if let Some(parent) = resolved.parent() {
            if !parent.exists() {
                if !options.create_parent_dirs {
                    return Err(FileError::illegal_path(
                        resolved,
                        "parent directory does not exist",
                    ));
                }
                std::fs::create_dir_all(parent).map_err(|e| FileError::from_io(parent, e))?;
            }
        }

        let mut open = OpenOptions::new();
        match options.mode {
            WriteMode::Overwrite => open.write(true).create(true),
            WriteMode::Append => open.append(true).create(true),
            WriteMode::CreateNew => open.write(true).create_new(true),
        };
        let mut file = open
            .open(&resolved)
            .map_err(|e| FileError::from_io(&resolved, e))?;

        let _lock = if options.lock {
            let handle = file
                .try_clone()
                .map_err(|e| FileError::from_io(&resolved, e))?;
            let mut lock = PathLock::new(&resolved, handle);
            if !lock.try_acquire()? {
                return Err(FileError::Locked { path: resolved });
            }
            Some(lock)
        } else {
            None
        };

        if options.mode == WriteMode::Overwrite {
            file.set_len(0)
                .map_err(|e| FileError::from_io(&resolved, e))?;
        }

        let written = io::copy(&mut content, &mut file).map_err(|e| {
            FileError::from_carried(e).unwrap_or_else(|e| FileError::from_io(&resolved, e))
        })?;
        file.flush().map_err(|e| FileError::from_io(&resolved, e))?;
        debug!(path = %resolved.display(), bytes = written, mode = ?options.mode, "wrote file");
        Ok(written)
    }
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;

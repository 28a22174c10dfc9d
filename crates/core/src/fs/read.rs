// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::LocalFileSystem;
use crate::attributes::{AttributeReader, LocalAttributeReader, PathSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::content::FileContent;
use crate::error::FileError;
use crate::lock::{PathLock, ReadGuard};
use crate::stability::SizeStabilityChecker;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Whether a read holds an exclusive lock while the content is open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    Unlocked,
    /// Wait up to `timeout` for the lock; zero means a single attempt
    Locked { timeout: Duration },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub lock: LockMode,
    pub size_check: Option<Duration>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(mut self, timeout: Duration) -> Self {
        self.lock = LockMode::Locked { timeout };
        self
    }

    pub fn with_size_check(mut self, interval: Duration) -> Self {
        self.size_check = Some(interval);
        self
    }
}

/// Build the guard a read of `path` should hold
pub fn acquire_guard<C: Clock>(
    path: &Path,
    mode: LockMode,
    clock: &C,
) -> Result<ReadGuard, FileError> {
    match mode {
        LockMode::Unlocked => Ok(ReadGuard::NoLock),
        LockMode::Locked { timeout } => {
            let mut lock = PathLock::open(path)?;
            lock.try_acquire_for(timeout, clock)?;
            Ok(ReadGuard::Locked(lock))
        }
    }
}

impl LocalFileSystem {
    /// Open a file for reading
    ///
    /// The returned content is opened lazily and releases its lock when
    /// closed. The snapshot is taken before any lock is acquired.
    pub fn read(
        &self,
        path: &Path,
        options: &ReadOptions,
    ) -> Result<(FileContent, PathSnapshot), FileError> {
        self.read_with_clock(path, options, &SystemClock)
    }

    pub fn read_with_clock<C: Clock>(
        &self,
        path: &Path,
        options: &ReadOptions,
        clock: &C,
    ) -> Result<(FileContent, PathSnapshot), FileError> {
        let resolved = self.resolve_existing_path(path)?;
        let snapshot = LocalAttributeReader.read(&resolved)?;
        if snapshot.is_directory {
            return Err(FileError::illegal_path(
                resolved,
                "cannot read a directory",
            ));
        }
        File::open(&resolved).map_err(|e| FileError::from_io(&resolved, e))?;

        let guard = acquire_guard(&resolved, options.lock, clock)?;
        let content = match options.size_check.filter(|i| !i.is_zero()) {
            Some(interval) => FileContent::with_stability_check(
                &resolved,
                guard,
                SizeStabilityChecker::new(LocalAttributeReader, clock.clone()),
                interval,
            ),
            None => FileContent::new(&resolved, guard),
        };
        Ok((content, snapshot))
    }
}

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory enumeration
//!
//! The walk keeps an explicit stack of directories still to be read, so deep
//! trees do not grow the call stack and a stop request is honoured between
//! directories. Unreadable subdirectories and entries that vanish mid-walk
//! are skipped; only a failure on the root aborts the walk.

use crate::attributes::{AttributeReader, PathSnapshot};
use crate::content::FileContent;
use crate::error::FileError;
use crate::lock::ReadGuard;
use crate::matcher::Matcher;
use crate::stop::StopSignal;
use std::fs::ReadDir;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One matched entry of a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub snapshot: PathSnapshot,
}

impl Listing {
    pub fn new(snapshot: PathSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot.path
    }

    /// Lazily opened content; `None` for directories and other non-files
    pub fn content(&self) -> Option<FileContent> {
        self.content_with(ReadGuard::NoLock)
    }

    pub fn content_with(&self, guard: ReadGuard) -> Option<FileContent> {
        self.snapshot
            .is_regular_file
            .then(|| FileContent::new(&self.snapshot.path, guard))
    }
}

impl AsRef<PathSnapshot> for Listing {
    fn as_ref(&self) -> &PathSnapshot {
        &self.snapshot
    }
}

impl AsRef<PathSnapshot> for PathSnapshot {
    fn as_ref(&self) -> &PathSnapshot {
        self
    }
}

/// Walk configuration
pub struct DirectoryWalker<'a, R> {
    reader: &'a R,
    matcher: &'a Matcher,
    recursive: bool,
    stop: Option<&'a StopSignal>,
}

impl<'a, R: AttributeReader> DirectoryWalker<'a, R> {
    pub fn new(reader: &'a R, matcher: &'a Matcher, recursive: bool) -> Self {
        Self {
            reader,
            matcher,
            recursive,
            stop: None,
        }
    }

    pub fn with_stop(mut self, stop: &'a StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Start walking `root`
    ///
    /// The root is opened eagerly so that an unreadable or missing root is
    /// reported here rather than silently producing nothing.
    pub fn walk(&self, root: &Path) -> Result<Walk<'a, R>, FileError> {
        let entries = std::fs::read_dir(root).map_err(|e| FileError::from_io(root, e))?;
        Ok(Walk {
            reader: self.reader,
            matcher: self.matcher,
            recursive: self.recursive,
            stop: self.stop,
            pending: Vec::new(),
            current: Some((root.to_path_buf(), entries)),
        })
    }
}

/// Lazy sequence of matched entries
pub struct Walk<'a, R> {
    reader: &'a R,
    matcher: &'a Matcher,
    recursive: bool,
    stop: Option<&'a StopSignal>,
    pending: Vec<PathBuf>,
    current: Option<(PathBuf, ReadDir)>,
}

impl<R: AttributeReader> Walk<'_, R> {
    fn open_next_directory(&mut self) -> bool {
        while let Some(dir) = self.pending.pop() {
            if self.stop.is_some_and(StopSignal::is_stopping) {
                debug!(path = %dir.display(), "stop requested, ending walk");
                self.pending.clear();
                return false;
            }
            match std::fs::read_dir(&dir) {
                Ok(entries) => {
                    self.current = Some((dir, entries));
                    return true;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %dir.display(), "directory vanished during walk");
                }
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
                }
            }
        }
        false
    }
}

impl<R: AttributeReader> Iterator for Walk<'_, R> {
    type Item = Listing;

    fn next(&mut self) -> Option<Listing> {
        loop {
            if self.current.is_none() && !self.open_next_directory() {
                return None;
            }
            let (dir, entries) = self.current.as_mut()?;

            let entry = match entries.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    warn!(path = %dir.display(), error = %e, "failed to read directory entry");
                    continue;
                }
            };

            let path = entry.path();
            let snapshot = match self.reader.read(&path) {
                Ok(snapshot) => snapshot,
                Err(FileError::NotFound { .. }) => {
                    debug!(path = %path.display(), "entry vanished during walk");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if self.recursive && snapshot.is_directory && !snapshot.is_symlink {
                self.pending.push(path);
            }
            if self.matcher.test(&snapshot) {
                return Some(Listing::new(snapshot));
            }
        }
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazily opened file content bound to a read guard
//!
//! Nothing is opened until the first read. Before that read the file is
//! checked again (existence, or size stability when configured). Reaching
//! end of file, calling [`FileContent::close`], or dropping the content
//! releases the guard exactly once.

use crate::attributes::AttributeReader;
use crate::clock::Clock;
use crate::error::FileError;
use crate::lock::{ReadGuard, Release};
use crate::stability::SizeStabilityChecker;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

type Precheck = Box<dyn FnOnce(&Path) -> Result<(), FileError> + Send>;

enum ContentState {
    Pending(Precheck),
    Open(BufReader<File>),
    Closed,
}

/// Readable content of one file
pub struct FileContent {
    path: PathBuf,
    guard: ReadGuard,
    state: ContentState,
}

impl FileContent {
    /// Content that only re-verifies existence before opening
    pub fn new(path: &Path, guard: ReadGuard) -> Self {
        Self {
            path: path.to_path_buf(),
            guard,
            state: ContentState::Pending(Box::new(verify_exists)),
        }
    }

    /// Content that waits for the size to settle before opening
    pub fn with_stability_check<R, C>(
        path: &Path,
        guard: ReadGuard,
        checker: SizeStabilityChecker<R, C>,
        interval: Duration,
    ) -> Self
    where
        R: AttributeReader + 'static,
        C: Clock,
    {
        let precheck: Precheck = Box::new(move |path: &Path| {
            checker.await_stable(path, Some(interval)).map(|_| ())
        });
        Self {
            path: path.to_path_buf(),
            guard,
            state: ContentState::Pending(precheck),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ContentState::Closed)
    }

    /// Release the guard and stop reading; safe to call more than once
    pub fn close(&mut self) {
        self.state = ContentState::Closed;
        self.guard.release();
    }

    fn open(&self, precheck: Precheck) -> Result<BufReader<File>, FileError> {
        precheck(&self.path)?;
        let file = self.guard.open_reader(&self.path).map_err(|e| {
            match FileError::from_io(&self.path, e) {
                FileError::NotFound { path } => FileError::DeletedWhileReading { path },
                other => other,
            }
        })?;
        Ok(BufReader::new(file))
    }
}

impl Read for FileContent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let ContentState::Pending(_) = self.state {
            let ContentState::Pending(precheck) =
                std::mem::replace(&mut self.state, ContentState::Closed)
            else {
                return Ok(0);
            };
            match self.open(precheck) {
                Ok(reader) => self.state = ContentState::Open(reader),
                Err(e) => {
                    self.close();
                    return Err(e.into());
                }
            }
        }

        let ContentState::Open(reader) = &mut self.state else {
            return Ok(0);
        };
        match reader.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.close();
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }
}

impl Drop for FileContent {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ContentState::Pending(_) => "pending",
            ContentState::Open(_) => "open",
            ContentState::Closed => "closed",
        };
        f.debug_struct("FileContent")
            .field("path", &self.path)
            .field("locked", &self.guard.is_locked())
            .field("state", &state)
            .finish()
    }
}

fn verify_exists(path: &Path) -> Result<(), FileError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FileError::DeletedWhileReading {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(FileError::from_io(path, e)),
    }
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;

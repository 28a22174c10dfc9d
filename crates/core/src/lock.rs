// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory path locks
//!
//! A [`PathLock`] owns one open handle and at most one OS advisory lock on
//! it. Acquisition is either a single non-blocking attempt or a busy-wait
//! bounded by a timeout. Release is idempotent and also happens on drop.

use crate::clock::Clock;
use crate::error::FileError;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Number of slices a lock timeout is divided into for the busy-wait
pub const LOCK_RETRY_DIVISOR: u32 = 20;

/// The OS-level operations a lock needs from its handle
pub trait LockPrimitive: Send {
    fn try_lock_exclusive(&self) -> io::Result<()>;
    fn unlock(&self) -> io::Result<()>;
}

impl LockPrimitive for File {
    fn try_lock_exclusive(&self) -> io::Result<()> {
        fs2::FileExt::try_lock_exclusive(self)
    }

    fn unlock(&self) -> io::Result<()> {
        fs2::FileExt::unlock(self)
    }
}

/// Anything holding a lock that must be given back
pub trait Release {
    fn release(&mut self);
    fn is_locked(&self) -> bool;
}

/// Exclusive advisory lock bound to one handle for one path
#[derive(Debug)]
pub struct PathLock<P: LockPrimitive = File> {
    path: PathBuf,
    handle: P,
    locked: bool,
}

impl PathLock<File> {
    /// Open `path` for read/write and wrap it, without locking yet
    pub fn open(path: &Path) -> Result<Self, FileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| FileError::from_io(path, e))?;
        Ok(Self::new(path, file))
    }

    /// Duplicate the underlying handle for reading or writing
    pub fn try_clone_handle(&self) -> io::Result<File> {
        self.handle.try_clone()
    }
}

impl<P: LockPrimitive> PathLock<P> {
    pub fn new(path: &Path, handle: P) -> Self {
        Self {
            path: path.to_path_buf(),
            handle,
            locked: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &P {
        &self.handle
    }

    /// Single non-blocking attempt
    ///
    /// Returns `Ok(false)` when another process holds the lock.
    pub fn try_acquire(&mut self) -> Result<bool, FileError> {
        if self.locked {
            return Err(FileError::AlreadyLocked {
                path: self.path.clone(),
            });
        }

        match self.handle.try_lock_exclusive() {
            Ok(()) => {
                self.locked = true;
                debug!(path = %self.path.display(), "lock acquired");
                Ok(true)
            }
            Err(e) if is_contended(&e) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(FileError::AccessDenied {
                path: self.path.clone(),
                source: e,
            }),
            Err(e) => {
                info!(
                    path = %self.path.display(),
                    error = %e,
                    "could not obtain lock, treating as locked"
                );
                Ok(false)
            }
        }
    }

    /// Busy-wait for the lock, sleeping `timeout / 20` between attempts
    ///
    /// A zero timeout makes exactly one attempt.
    pub fn try_acquire_for<C: Clock>(
        &mut self,
        timeout: Duration,
        clock: &C,
    ) -> Result<(), FileError> {
        let started = clock.now();
        let pause = timeout / LOCK_RETRY_DIVISOR;

        loop {
            if self.try_acquire()? {
                return Ok(());
            }
            if timeout.is_zero() {
                return Err(FileError::Locked {
                    path: self.path.clone(),
                });
            }
            let waited = clock.since(started);
            if waited >= timeout {
                return Err(FileError::LockTimeout {
                    path: self.path.clone(),
                    timeout,
                    waited,
                });
            }
            clock.sleep(pause);
        }
    }
}

impl<P: LockPrimitive> Release for PathLock<P> {
    fn release(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;
        if let Err(e) = self.handle.unlock() {
            debug!(path = %self.path.display(), error = %e, "unlock failed");
        } else {
            debug!(path = %self.path.display(), "lock released");
        }
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

impl<P: LockPrimitive> Drop for PathLock<P> {
    fn drop(&mut self) {
        self.release();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Lock presence for a read: either nothing to release or an owned lock
#[derive(Debug)]
pub enum ReadGuard {
    NoLock,
    Locked(PathLock),
}

impl ReadGuard {
    /// Open a reader for `path`, sharing the locked handle when there is one
    pub fn open_reader(&self, path: &Path) -> io::Result<File> {
        match self {
            ReadGuard::NoLock => File::open(path),
            ReadGuard::Locked(lock) => lock.try_clone_handle(),
        }
    }
}

impl Release for ReadGuard {
    fn release(&mut self) {
        if let ReadGuard::Locked(lock) = self {
            lock.release();
        }
    }

    fn is_locked(&self) -> bool {
        match self {
            ReadGuard::NoLock => false,
            ReadGuard::Locked(lock) => lock.is_locked(),
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-stability detection
//!
//! A file is considered finished when its size is unchanged across one
//! interval. A growing file gets [`MAX_SIZE_CHECK_RETRIES`] more intervals
//! before it is reported as still being written.

use crate::attributes::{AttributeReader, PathSnapshot};
use crate::clock::Clock;
use crate::error::FileError;
use crate::stop::StopSignal;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Extra comparisons allowed after the first size mismatch
pub const MAX_SIZE_CHECK_RETRIES: u32 = 2;

pub fn sizes_match(previous: &PathSnapshot, current: &PathSnapshot) -> bool {
    previous.size == current.size
}

/// Waits for files to stop growing
#[derive(Debug, Clone)]
pub struct SizeStabilityChecker<R, C> {
    reader: R,
    clock: C,
    stop: Option<StopSignal>,
}

impl<R: AttributeReader, C: Clock> SizeStabilityChecker<R, C> {
    pub fn new(reader: R, clock: C) -> Self {
        Self {
            reader,
            clock,
            stop: None,
        }
    }

    /// Abort waits with `WaitInterrupted` once `stop` is raised
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Return the latest snapshot once the size is stable
    ///
    /// With no interval (or a zero one) the file is read once, without delay.
    pub fn await_stable(
        &self,
        path: &Path,
        interval: Option<Duration>,
    ) -> Result<PathSnapshot, FileError> {
        let mut previous = self.sample(path)?;
        let Some(interval) = interval.filter(|i| !i.is_zero()) else {
            return Ok(previous);
        };

        for attempt in 0..=MAX_SIZE_CHECK_RETRIES {
            self.pause(path, interval)?;
            let current = self.sample(path)?;
            if sizes_match(&previous, &current) {
                return Ok(current);
            }
            debug!(
                path = %path.display(),
                attempt,
                previous = previous.size,
                current = current.size,
                "file size changed, still being written"
            );
            previous = current;
        }

        Err(FileError::StillWriting {
            path: path.to_path_buf(),
        })
    }

    /// Read attributes, reporting disappearance as `DeletedWhileReading`
    pub fn sample(&self, path: &Path) -> Result<PathSnapshot, FileError> {
        self.reader.read(path).map_err(|e| match e {
            FileError::NotFound { path } => FileError::DeletedWhileReading { path },
            other => other,
        })
    }

    /// Sleep one interval, failing if a stop was requested meanwhile
    pub fn pause(&self, path: &Path, interval: Duration) -> Result<(), FileError> {
        self.clock.sleep(interval);
        if self.stop.as_ref().is_some_and(StopSignal::is_stopping) {
            return Err(FileError::WaitInterrupted {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
#[path = "stability_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory listener and its poll cycle
//!
//! One call to [`DirectoryListener::poll`] is one pass over the watched
//! directory:
//!
//! 1. connect and compile the matcher against a single `now`
//! 2. walk, dropping in-flight paths and files at or below the watermark
//! 3. wait for sizes to settle, in passes (growing files get two retries)
//! 4. lock, mark in flight, and hand each ready file to the sink
//! 5. advance the watermark to the latest delivered timestamp
//! 6. disconnect
//!
//! Errors inside a cycle are logged and end that cycle only. A delivered
//! [`PolledFile`] owns its lock and in-flight marker until it is completed,
//! rejected, or dropped.

use crate::attributes::{AttributeReader, LocalAttributeReader, PathSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::content::FileContent;
use crate::error::FileError;
use crate::fs::{acquire_guard, ConnectionProvider, LocalFileSystem, LockMode};
use crate::inflight::InFlightTracker;
use crate::matcher::{MatchCriteria, Matcher};
use crate::post_action::{Outcome, PostActionPolicy};
use crate::stability::{sizes_match, SizeStabilityChecker, MAX_SIZE_CHECK_RETRIES};
use crate::stop::StopSignal;
use crate::store::{KeyValueStore, StoreError};
use crate::walker::DirectoryWalker;
use crate::watermark::{admits, WatermarkMode, WatermarkStore};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a poll cycle or prevent a listener from starting
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    File(#[from] FileError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Static configuration of one listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub name: String,
    pub directory: PathBuf,
    pub recursive: bool,
    pub matcher: Option<MatchCriteria>,
    pub watermark: WatermarkMode,
    pub size_check_interval: Option<Duration>,
    pub lock: LockMode,
    pub post_action: PostActionPolicy,
}

impl ListenerConfig {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            recursive: true,
            matcher: None,
            watermark: WatermarkMode::Disabled,
            size_check_interval: None,
            lock: LockMode::Unlocked,
            post_action: PostActionPolicy::default(),
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_matcher(mut self, criteria: MatchCriteria) -> Self {
        self.matcher = Some(criteria);
        self
    }

    pub fn with_watermark(mut self, mode: WatermarkMode) -> Self {
        self.watermark = mode;
        self
    }

    pub fn with_size_check(mut self, interval: Duration) -> Self {
        self.size_check_interval = Some(interval);
        self
    }

    pub fn with_lock(mut self, lock: LockMode) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_post_action(mut self, policy: PostActionPolicy) -> Self {
        self.post_action = policy;
        self
    }
}

/// Where a listener is within a poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollPhase {
    #[default]
    Idle,
    Connecting,
    Walking,
    StabilityCheck,
    Dispatching,
    SourceStopping,
    Done,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollPhase::Idle => "idle",
            PollPhase::Connecting => "connecting",
            PollPhase::Walking => "walking",
            PollPhase::StabilityCheck => "stability_check",
            PollPhase::Dispatching => "dispatching",
            PollPhase::SourceStopping => "source_stopping",
            PollPhase::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Counters for one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub delivered: usize,
    pub skipped_in_flight: usize,
    pub filtered_by_watermark: usize,
    pub still_writing: usize,
    pub locked: usize,
    pub rejected: usize,
    pub stopped: bool,
    pub aborted: bool,
    pub watermark: Option<DateTime<Utc>>,
}

/// What the sink did with an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollItemStatus {
    Accepted,
    /// Accepted, and the host is shutting down: dispatch nothing more
    SourceStopping,
}

/// An item the sink refused, handed back for release
#[derive(Debug)]
pub struct Rejected {
    pub item: PolledFile,
    pub reason: String,
}

impl Rejected {
    pub fn new(item: PolledFile, reason: impl Into<String>) -> Self {
        Self {
            item,
            reason: reason.into(),
        }
    }
}

/// Receiver of polled files
pub trait PollSink {
    /// Checked before the cycle starts and before each dispatch
    fn is_stopping(&self) -> bool {
        false
    }

    fn accept(&mut self, item: PolledFile) -> Result<PollItemStatus, Rejected>;
}

/// Everything needed to finish an item after processing
#[derive(Debug)]
struct Completion {
    fs: LocalFileSystem,
    policy: PostActionPolicy,
    inflight: InFlightTracker,
    path: PathBuf,
    finished: bool,
}

impl Completion {
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.inflight.unmark(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to clear in-flight marker");
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A file delivered by a poll
///
/// Holds the file's lock (if any) through its content and its in-flight
/// marker. Completing, rejecting or dropping the item releases both.
#[derive(Debug)]
pub struct PolledFile {
    snapshot: PathSnapshot,
    content: Option<FileContent>,
    completion: Completion,
}

impl PolledFile {
    pub fn snapshot(&self) -> &PathSnapshot {
        &self.snapshot
    }

    pub fn path(&self) -> &Path {
        &self.snapshot.path
    }

    /// The file's content; `None` once closed by completion
    pub fn content(&mut self) -> Option<&mut FileContent> {
        self.content.as_mut()
    }

    pub fn is_locked(&self) -> bool {
        self.content.as_ref().is_some_and(FileContent::is_locked)
    }

    /// Finish processing
    ///
    /// The content is closed (releasing any lock) before the post action
    /// runs; the in-flight marker is cleared last.
    pub fn complete(mut self, outcome: Outcome) -> Result<(), FileError> {
        if let Some(mut content) = self.content.take() {
            content.close();
        }

        let policy = &self.completion.policy;
        let result = if policy.applies_to(outcome) {
            debug!(
                path = %self.snapshot.path.display(),
                action = %policy.action,
                %outcome,
                "applying post action"
            );
            policy.action.apply(&self.completion.fs, &self.snapshot)
        } else {
            Ok(())
        };

        self.completion.finish();
        result
    }

    /// Release without processing or post action
    pub fn reject(mut self) {
        if let Some(mut content) = self.content.take() {
            content.close();
        }
        self.completion.finish();
    }
}

/// Polls one directory and dispatches new, stable files
pub struct DirectoryListener<P, R = LocalAttributeReader, C = SystemClock> {
    config: ListenerConfig,
    provider: P,
    reader: R,
    clock: C,
    watermarks: Arc<dyn KeyValueStore>,
    inflight: InFlightTracker,
    stop: StopSignal,
    connection: Option<LocalFileSystem>,
    phase: PollPhase,
}

impl<P: ConnectionProvider> DirectoryListener<P> {
    /// Validate the configuration and build a listener
    ///
    /// Fails with `InvalidConfiguration` for a bad matcher pattern.
    pub fn new(
        config: ListenerConfig,
        provider: P,
        watermarks: Arc<dyn KeyValueStore>,
        inflight: InFlightTracker,
    ) -> Result<Self, FileError> {
        if let Some(criteria) = &config.matcher {
            Matcher::compile(criteria, Utc::now())?;
        }
        Ok(Self {
            config,
            provider,
            reader: LocalAttributeReader,
            clock: SystemClock,
            watermarks,
            inflight,
            stop: StopSignal::new(),
            connection: None,
            phase: PollPhase::Idle,
        })
    }
}

impl<P: ConnectionProvider, R: AttributeReader, C: Clock> DirectoryListener<P, R, C> {
    pub fn with_reader<R2: AttributeReader>(self, reader: R2) -> DirectoryListener<P, R2, C> {
        DirectoryListener {
            config: self.config,
            provider: self.provider,
            reader,
            clock: self.clock,
            watermarks: self.watermarks,
            inflight: self.inflight,
            stop: self.stop,
            connection: self.connection,
            phase: self.phase,
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> DirectoryListener<P, R, C2> {
        DirectoryListener {
            config: self.config,
            provider: self.provider,
            reader: self.reader,
            clock,
            watermarks: self.watermarks,
            inflight: self.inflight,
            stop: self.stop,
            connection: self.connection,
            phase: self.phase,
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Handle that can request a stop while a poll is running elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_stopping()
    }

    /// Connect and check the watched directory exists
    ///
    /// The connection is kept for post actions until [`stop`](Self::stop).
    pub fn start(&mut self) -> Result<(), FileError> {
        self.stop.reset();
        let fs = self.provider.connect()?;
        let root = fs.resolve_existing_path(&self.config.directory)?;
        if !self.reader.read(&root)?.is_directory {
            self.provider.disconnect(fs);
            return Err(FileError::illegal_path(root, "path is not a directory"));
        }
        info!(
            listener = %self.config.name,
            directory = %root.display(),
            watermark = %self.config.watermark,
            "listener started"
        );
        if let Some(previous) = self.connection.replace(fs) {
            self.provider.disconnect(previous);
        }
        Ok(())
    }

    /// Stop dispatching and drop the long-lived connection
    pub fn stop(&mut self) {
        self.stop.request_stop();
        if let Some(fs) = self.connection.take() {
            self.provider.disconnect(fs);
        }
        info!(listener = %self.config.name, "listener stopped");
    }

    /// Run one poll cycle
    pub fn poll<S: PollSink + ?Sized>(&mut self, sink: &mut S) -> PollReport {
        let mut report = PollReport::default();
        if self.stop.is_stopping() || sink.is_stopping() {
            report.stopped = true;
            return report;
        }

        self.phase = PollPhase::Connecting;
        let fs = match self.provider.connect() {
            Ok(fs) => fs,
            Err(e) => {
                error!(
                    listener = %self.config.name,
                    directory = %self.config.directory.display(),
                    error = %e,
                    "could not connect, skipping poll"
                );
                report.aborted = true;
                self.phase = PollPhase::Idle;
                return report;
            }
        };

        if let Err(e) = self.run_cycle(&fs, sink, &mut report) {
            error!(
                listener = %self.config.name,
                directory = %self.config.directory.display(),
                error = %e,
                "poll cycle aborted"
            );
            report.aborted = true;
        }
        self.provider.disconnect(fs);

        debug!(
            listener = %self.config.name,
            phase = %self.phase,
            delivered = report.delivered,
            in_flight = report.skipped_in_flight,
            below_watermark = report.filtered_by_watermark,
            still_writing = report.still_writing,
            locked = report.locked,
            rejected = report.rejected,
            "poll finished"
        );
        self.phase = PollPhase::Idle;
        report
    }

    fn run_cycle<S: PollSink + ?Sized>(
        &mut self,
        fs: &LocalFileSystem,
        sink: &mut S,
        report: &mut PollReport,
    ) -> Result<(), PollError> {
        self.phase = PollPhase::Walking;
        let root = fs.resolve_existing_path(&self.config.directory)?;
        let now = self.clock.now();
        let matcher = match &self.config.matcher {
            Some(criteria) => Matcher::compile(criteria, now)?,
            None => Matcher::accept_all(),
        };

        let mode = self.config.watermark;
        let watermark = WatermarkStore::for_directory(Arc::clone(&self.watermarks), &root);
        let current = if mode.is_enabled() {
            watermark.current()?
        } else {
            None
        };

        let mut candidates = Vec::new();
        let walk = DirectoryWalker::new(&self.reader, &matcher, self.config.recursive)
            .with_stop(&self.stop)
            .walk(&root)?;
        for listing in walk {
            let snapshot = listing.snapshot;
            if !snapshot.is_regular_file {
                continue;
            }
            if self.inflight.contains(&snapshot.path)? {
                report.skipped_in_flight += 1;
                continue;
            }
            if !admits(mode, &snapshot, current) {
                report.filtered_by_watermark += 1;
                continue;
            }
            candidates.push(snapshot);
        }

        let post_fs = self.connection.clone().unwrap_or_else(|| fs.clone());
        let mut latest: Option<DateTime<Utc>> = None;
        let interval = self.config.size_check_interval.filter(|i| !i.is_zero());

        match interval {
            None => {
                self.phase = PollPhase::Dispatching;
                if !self.dispatch(candidates, &post_fs, sink, report, &mut latest) {
                    self.phase = PollPhase::SourceStopping;
                }
            }
            Some(interval) => {
                let checker = SizeStabilityChecker::new(&self.reader, self.clock.clone())
                    .with_stop(self.stop.clone());
                let mut pending = candidates;

                for pass in 0..=MAX_SIZE_CHECK_RETRIES {
                    if pending.is_empty() {
                        break;
                    }
                    self.phase = PollPhase::StabilityCheck;
                    match checker.pause(&root, interval) {
                        Ok(()) => {}
                        Err(FileError::WaitInterrupted { .. }) => {
                            info!(
                                listener = %self.config.name,
                                pending = pending.len(),
                                "stop requested during stability wait"
                            );
                            report.stopped = true;
                            self.phase = PollPhase::SourceStopping;
                            pending.clear();
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "stability wait failed");
                            break;
                        }
                    }

                    let mut ready = Vec::new();
                    let mut growing = Vec::new();
                    for previous in pending {
                        match checker.sample(&previous.path) {
                            Ok(current) if sizes_match(&previous, &current) => {
                                if matcher.test(&current) {
                                    ready.push(current);
                                }
                            }
                            Ok(current) => growing.push(current),
                            Err(FileError::DeletedWhileReading { path }) => {
                                debug!(path = %path.display(), "file deleted before dispatch");
                            }
                            Err(e) => {
                                warn!(path = %previous.path.display(), error = %e, "skipping file");
                            }
                        }
                    }
                    debug!(pass, ready = ready.len(), growing = growing.len(), "stability pass");
                    pending = growing;

                    self.phase = PollPhase::Dispatching;
                    if !self.dispatch(ready, &post_fs, sink, report, &mut latest) {
                        self.phase = PollPhase::SourceStopping;
                        pending.clear();
                        break;
                    }
                }

                for file in &pending {
                    warn!(
                        path = %file.path.display(),
                        "file is still being written, retrying on next poll"
                    );
                }
                report.still_writing += pending.len();
            }
        }

        if let Some(latest) = latest {
            report.watermark = Some(watermark.advance(latest)?);
        } else {
            report.watermark = current;
        }
        if self.phase != PollPhase::SourceStopping {
            self.phase = PollPhase::Done;
        }
        Ok(())
    }

    /// Hand files to the sink; returns false once the host is stopping
    fn dispatch<S: PollSink + ?Sized>(
        &self,
        files: Vec<PathSnapshot>,
        fs: &LocalFileSystem,
        sink: &mut S,
        report: &mut PollReport,
        latest: &mut Option<DateTime<Utc>>,
    ) -> bool {
        for snapshot in files {
            if self.stop.is_stopping() || sink.is_stopping() {
                report.stopped = true;
                return false;
            }

            let guard = match acquire_guard(&snapshot.path, self.config.lock, &self.clock) {
                Ok(guard) => guard,
                Err(e) if e.is_lock_contention() => {
                    warn!(path = %snapshot.path.display(), error = %e, "file is locked, skipping");
                    report.locked += 1;
                    continue;
                }
                Err(FileError::NotFound { path }) => {
                    debug!(path = %path.display(), "file deleted before dispatch");
                    continue;
                }
                Err(e) => {
                    warn!(path = %snapshot.path.display(), error = %e, "could not open file, skipping");
                    continue;
                }
            };

            if let Err(e) = self.inflight.mark(&snapshot.path) {
                warn!(path = %snapshot.path.display(), error = %e, "could not mark file in flight");
                continue;
            }

            let timestamp = self.config.watermark.timestamp(&snapshot);
            let item = PolledFile {
                content: Some(FileContent::new(&snapshot.path, guard)),
                completion: Completion {
                    fs: fs.clone(),
                    policy: self.config.post_action.clone(),
                    inflight: self.inflight.clone(),
                    path: snapshot.path.clone(),
                    finished: false,
                },
                snapshot,
            };

            match sink.accept(item) {
                Ok(status) => {
                    report.delivered += 1;
                    if let Some(ts) = timestamp {
                        *latest = (*latest).max(Some(ts));
                    }
                    if status == PollItemStatus::SourceStopping {
                        report.stopped = true;
                        return false;
                    }
                }
                Err(rejected) => {
                    warn!(
                        path = %rejected.item.path().display(),
                        reason = %rejected.reason,
                        "item rejected"
                    );
                    report.rejected += 1;
                    rejected.item.reject();
                }
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;

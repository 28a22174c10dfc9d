// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed key-value store with crash recovery
//!
//! Opening the store replays the log into memory. A torn or corrupt tail
//! (the signature of a crash mid-append) is truncated away so later
//! appends start on a clean line. Once enough superseded entries pile up,
//! the log is rewritten to hold only live entries.

use crate::entry::StoreOp;
use crate::reader::WalReader;
use crate::state::MaterializedState;
use crate::writer::WalWriter;
use fpoll_core::clock::{Clock, SystemClock};
use fpoll_core::store::{expiry, KeyValueStore, StoreError};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Appends since the last compaction before the log is rewritten
pub const DEFAULT_COMPACTION_THRESHOLD: u64 = 1000;

/// Result of a compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionResult {
    pub entries_kept: usize,
    pub bytes_reclaimed: u64,
}

struct Inner {
    writer: WalWriter,
    state: MaterializedState,
    appended: u64,
}

/// Durable [`KeyValueStore`] over a single WAL file
pub struct WalStore<C: Clock = SystemClock> {
    path: PathBuf,
    inner: Mutex<Inner>,
    clock: C,
    compaction_threshold: u64,
}

impl WalStore<SystemClock> {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> WalStore<C> {
    pub fn open_with_clock(path: &Path, clock: C) -> Result<Self, StoreError> {
        let mut state = MaterializedState::new();
        let mut iter = WalReader::open(path).entries()?;
        let mut replayed = 0u64;
        let mut corruption = None;

        for entry in iter.by_ref() {
            match entry {
                Ok(entry) => {
                    state.apply(&entry.operation);
                    replayed += 1;
                }
                Err(e) => {
                    corruption = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = corruption {
            let position = iter.last_valid_position();
            warn!(path = %path.display(), error = %e, position, "truncating corrupt WAL tail");
            truncate(path, position)?;
        }

        let writer = WalWriter::open(path)?;
        info!(
            path = %path.display(),
            replayed,
            live = state.len(),
            "opened state store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner {
                writer,
                state,
                appended: replayed,
            }),
            clock,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        })
    }

    pub fn with_compaction_threshold(mut self, threshold: u64) -> Self {
        self.compaction_threshold = threshold.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.lock().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries from memory; returns how many were removed
    ///
    /// Expiry is absolute, so replay after a restart hides them as well.
    pub fn sweep(&self) -> usize {
        let now = self.now_micros();
        self.lock().state.purge_expired(now)
    }

    /// Rewrite the log with only live entries
    pub fn compact(&self) -> Result<CompactionResult, StoreError> {
        let mut inner = self.lock();
        self.compact_locked(&mut inner)
    }

    fn compact_locked(&self, inner: &mut Inner) -> Result<CompactionResult, StoreError> {
        let now = self.now_micros();
        let old_size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        inner.state.purge_expired(now);
        let ops = inner.state.live_ops(now);

        // The temp writer's handle follows the file through the rename, so
        // once the rename lands there is nothing left to reopen
        let temp_path = self.path.with_extension("wal.compact.tmp");
        let _ = std::fs::remove_file(&temp_path);
        let mut temp = WalWriter::open(&temp_path)?;
        for op in &ops {
            temp.append(op.clone(), now)?;
        }
        std::fs::rename(&temp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            sync_dir(parent);
        }

        inner.writer = temp.renamed_to(&self.path);
        inner.appended = ops.len() as u64;

        let new_size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        let result = CompactionResult {
            entries_kept: ops.len(),
            bytes_reclaimed: old_size.saturating_sub(new_size),
        };
        info!(
            path = %self.path.display(),
            entries_kept = result.entries_kept,
            bytes_reclaimed = result.bytes_reclaimed,
            "compacted state store"
        );
        Ok(result)
    }

    fn append(&self, inner: &mut Inner, op: StoreOp) -> Result<(), StoreError> {
        inner.writer.append(op.clone(), self.now_micros())?;
        inner.state.apply(&op);
        inner.appended += 1;

        let live = inner.state.len() as u64;
        if inner.appended >= self.compaction_threshold && inner.appended > live * 2 {
            debug!(appended = inner.appended, live, "compaction threshold reached");
            self.compact_locked(inner)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now_micros(&self) -> i64 {
        self.clock.now().timestamp_micros()
    }
}

impl<C: Clock> KeyValueStore for WalStore<C> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.now_micros();
        Ok(self.lock().state.get(key, now).map(str::to_string))
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at_micros = expiry(self.clock.now(), ttl).map(|t| t.timestamp_micros());
        let mut inner = self.lock();
        self.append(
            &mut inner,
            StoreOp::Put {
                key: key.to_string(),
                value,
                expires_at_micros,
            },
        )
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let now = self.now_micros();
        let mut inner = self.lock();
        if inner.state.get(key, now).is_none() {
            return Ok(());
        }
        self.append(
            &mut inner,
            StoreOp::Remove {
                key: key.to_string(),
            },
        )
    }
}

fn truncate(path: &Path, position: u64) -> Result<(), StoreError> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(position)?;
    file.sync_all()?;
    Ok(())
}

fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(path = %dir.display(), error = %e, "could not sync directory");
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

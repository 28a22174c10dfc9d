// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value persistence used for watermarks and in-flight markers

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupted entry at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Shared store with optional per-entry expiry
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).put(key, value, ttl)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        (**self).contains(key)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
    sequence: u64,
}

impl MemoryEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, MemoryEntry>,
    next_sequence: u64,
}

/// Bounded in-memory store
///
/// When full, inserting a new key evicts the oldest inserted entry. Expired
/// entries are invisible to reads and dropped by [`MemoryStore::sweep`].
#[derive(Debug, Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<MemoryInner>>,
    max_entries: usize,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, SystemClock)
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(max_entries: usize, clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner::default())),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Drop expired entries; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired store entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> KeyValueStore for MemoryStore<C> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = self.clock.now();
        let expires_at = expiry(now, ttl);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            inner.entries.retain(|_, entry| !entry.is_expired(now));
            if inner.entries.len() >= self.max_entries {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.sequence)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "store full, evicting oldest entry");
                    inner.entries.remove(&oldest);
                }
            }
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at,
                sequence,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .remove(key);
        Ok(())
    }
}

/// Absolute expiry for a TTL starting at `now`
pub fn expiry(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl?).ok()?;
    now.checked_add_signed(ttl)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

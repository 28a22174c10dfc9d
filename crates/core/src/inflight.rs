// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paths currently committed to a delivery

use crate::store::{KeyValueStore, StoreError};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_INFLIGHT_TTL: Duration = Duration::from_secs(60);

/// Short-TTL set of in-flight paths
///
/// The TTL is a safety net for markers orphaned by a crash; normal
/// completion removes the marker explicitly.
#[derive(Clone)]
pub struct InFlightTracker {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl InFlightTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_INFLIGHT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn contains(&self, path: &Path) -> Result<bool, StoreError> {
        self.store.contains(&key(path))
    }

    pub fn mark(&self, path: &Path) -> Result<(), StoreError> {
        self.store.put(
            &key(path),
            path.to_string_lossy().into_owned(),
            Some(self.ttl),
        )
    }

    pub fn unmark(&self, path: &Path) -> Result<(), StoreError> {
        self.store.remove(&key(path))
    }
}

impl fmt::Debug for InFlightTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightTracker")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn key(path: &Path) -> String {
    format!("inflight:{}", path.display())
}

#[cfg(test)]
#[path = "inflight_tests.rs"]
mod tests;

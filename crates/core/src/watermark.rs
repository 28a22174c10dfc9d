// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-directory high-water timestamp

use crate::attributes::PathSnapshot;
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Which timestamp feeds the watermark
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkMode {
    #[default]
    Disabled,
    Modified,
    Created,
}

impl WatermarkMode {
    /// The qualifying timestamp of `snapshot`, `None` when disabled
    pub fn timestamp(self, snapshot: &PathSnapshot) -> Option<DateTime<Utc>> {
        match self {
            WatermarkMode::Disabled => None,
            WatermarkMode::Modified => Some(snapshot.modified_at),
            WatermarkMode::Created => Some(snapshot.created_at),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != WatermarkMode::Disabled
    }
}

impl fmt::Display for WatermarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkMode::Disabled => write!(f, "disabled"),
            WatermarkMode::Modified => write!(f, "modified"),
            WatermarkMode::Created => write!(f, "created"),
        }
    }
}

/// Watermark of one watched directory
///
/// Stored as RFC 3339 text under `watermark:<directory>`. Never regresses.
#[derive(Clone)]
pub struct WatermarkStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl WatermarkStore {
    pub fn for_directory(store: Arc<dyn KeyValueStore>, directory: &Path) -> Self {
        Self {
            store,
            key: format!("watermark:{}", directory.display()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn current(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| StoreError::Invalid {
                key: self.key.clone(),
                reason: e.to_string(),
            })
    }

    /// Persist `candidate` if it is later than the stored value
    ///
    /// Returns the watermark in effect afterwards.
    pub fn advance(&self, candidate: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        if let Some(current) = self.current()? {
            if current >= candidate {
                return Ok(current);
            }
        }
        self.store.put(&self.key, candidate.to_rfc3339(), None)?;
        Ok(candidate)
    }
}

/// Whether a file passes the watermark filter
///
/// A file is admitted only when its timestamp is strictly later than the
/// current watermark.
pub fn admits(
    mode: WatermarkMode,
    snapshot: &PathSnapshot,
    watermark: Option<DateTime<Utc>>,
) -> bool {
    match (mode.timestamp(snapshot), watermark) {
        (Some(ts), Some(mark)) => ts > mark,
        _ => true,
    }
}

#[cfg(test)]
#[path = "watermark_tests.rs"]
mod tests;

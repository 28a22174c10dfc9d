// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use crate::entry::StoreOp;
use std::collections::BTreeMap;

/// A stored value and its absolute expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub expires_at_micros: Option<i64>,
}

impl StoredValue {
    pub fn is_expired(&self, now_micros: i64) -> bool {
        self.expires_at_micros.is_some_and(|at| at <= now_micros)
    }
}

/// Key-value map built by applying operations in sequence order
#[derive(Debug, Default)]
pub struct MaterializedState {
    entries: BTreeMap<String, StoredValue>,
}

impl MaterializedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::Put {
                key,
                value,
                expires_at_micros,
            } => {
                self.entries.insert(
                    key.clone(),
                    StoredValue {
                        value: value.clone(),
                        expires_at_micros: *expires_at_micros,
                    },
                );
            }
            StoreOp::Remove { key } => {
                self.entries.remove(key);
            }
        }
    }

    /// Live value of `key` at `now_micros`
    pub fn get(&self, key: &str, now_micros: i64) -> Option<&str> {
        self.entries
            .get(key)
            .filter(|v| !v.is_expired(now_micros))
            .map(|v| v.value.as_str())
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&mut self, now_micros: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, v| !v.is_expired(now_micros));
        before - self.entries.len()
    }

    /// Operations that rebuild the live entries
    pub fn live_ops(&self, now_micros: i64) -> Vec<StoreOp> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_expired(now_micros))
            .map(|(key, v)| StoreOp::Put {
                key: key.clone(),
                value: v.value.clone(),
                expires_at_micros: v.expires_at_micros,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

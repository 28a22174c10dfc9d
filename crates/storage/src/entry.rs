// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL entry structure with checksum verification

use fpoll_core::StoreError;
use serde::{Deserialize, Serialize};

/// A mutation of the key-value store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOp {
    Put {
        key: String,
        value: String,
        /// Absolute expiry in microseconds since the Unix epoch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at_micros: Option<i64>,
    },
    Remove {
        key: String,
    },
}

impl StoreOp {
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Put { key, .. } | StoreOp::Remove { key } => key,
        }
    }
}

/// A single line of the write-ahead log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Monotonically increasing sequence number
    pub sequence: u64,
    /// Microseconds since Unix epoch
    pub timestamp_micros: i64,
    pub operation: StoreOp,
    /// CRC32 of the serialized operation
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(sequence: u64, timestamp_micros: i64, operation: StoreOp) -> Self {
        let checksum = Self::calculate_checksum(&operation);
        Self {
            sequence,
            timestamp_micros,
            operation,
            checksum,
        }
    }

    fn calculate_checksum(operation: &StoreOp) -> u32 {
        // StoreOp holds only strings and integers, so serialization cannot fail
        let json = serde_json::to_string(operation).unwrap_or_default();
        crc32fast::hash(json.as_bytes())
    }

    /// Verify the checksum matches the operation
    pub fn verify(&self) -> bool {
        self.checksum == Self::calculate_checksum(&self.operation)
    }

    /// Serialize to one line of JSON
    pub fn to_line(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(StoreError::from)
    }

    pub fn from_line(line: &str) -> Result<Self, StoreError> {
        serde_json::from_str(line).map_err(StoreError::from)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;

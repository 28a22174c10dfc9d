// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL writer for durable append operations
//!
//! Every append is fsync'd before it returns.

use crate::entry::{StoreOp, WalEntry};
use crate::reader::WalReader;
use fpoll_core::StoreError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    bytes_written: u64,
}

impl WalWriter {
    /// Open or create a WAL file, continuing after its last valid sequence
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let next_sequence = WalReader::open(path)
            .last_sequence()?
            .map_or(0, |s| s + 1);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
            bytes_written: 0,
        })
    }

    /// Append an operation; returns its sequence number
    pub fn append(&mut self, operation: StoreOp, timestamp_micros: i64) -> Result<u64, StoreError> {
        let sequence = self.next_sequence;
        let entry = WalEntry::new(sequence, timestamp_micros, operation);
        let line = entry.to_line()?;

        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.sync_all()?;

        self.next_sequence += 1;
        self.bytes_written += line.len() as u64 + 1;
        Ok(sequence)
    }

    /// Next sequence number to be assigned
    pub fn sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that the underlying file was renamed to `path`
    pub(crate) fn renamed_to(mut self, path: &Path) -> Self {
        self.path = path.to_path_buf();
        self
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;

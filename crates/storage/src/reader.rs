// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL reader with corruption detection
//!
//! A line that fails to parse or verify marks the end of the usable log.
//! Everything from that line on is treated as a torn write.

use crate::entry::WalEntry;
use fpoll_core::StoreError;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalReadError {
    #[error("corrupted entry at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("checksum mismatch at line {line}")]
    ChecksumMismatch { line: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<WalReadError> for StoreError {
    fn from(err: WalReadError) -> Self {
        match err {
            WalReadError::Corrupted { line, reason } => StoreError::Corrupted { line, reason },
            WalReadError::ChecksumMismatch { line } => StoreError::Corrupted {
                line,
                reason: "checksum mismatch".to_string(),
            },
            WalReadError::Io(e) => StoreError::Io(e),
        }
    }
}

pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    /// A reader over `path`; a missing file reads as empty
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Iterate entries, stopping after the first corrupt one
    pub fn entries(&self) -> Result<WalEntryIter, WalReadError> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(WalEntryIter {
            reader,
            line_number: 0,
            position: 0,
            last_valid_position: 0,
        })
    }

    /// Last valid sequence number, if any
    pub fn last_sequence(&self) -> Result<Option<u64>, WalReadError> {
        let mut last = None;
        for entry in self.entries()? {
            match entry {
                Ok(entry) => last = Some(entry.sequence),
                Err(_) => break,
            }
        }
        Ok(last)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Iterator over WAL entries with position tracking
pub struct WalEntryIter {
    reader: Option<BufReader<File>>,
    line_number: u64,
    position: u64,
    last_valid_position: u64,
}

impl WalEntryIter {
    /// Byte offset just past the last valid entry read so far
    pub fn last_valid_position(&self) -> u64 {
        self.last_valid_position
    }

    fn fail(&mut self, err: WalReadError) -> Option<Result<WalEntry, WalReadError>> {
        self.reader = None;
        Some(Err(err))
    }
}

impl Iterator for WalEntryIter {
    type Item = Result<WalEntry, WalReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            let mut line = String::new();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(n) => n as u64,
                Err(e) => return self.fail(WalReadError::Io(e)),
            };
            self.line_number += 1;
            self.position += bytes_read;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // A final line without newline is a write cut short
            if !line.ends_with('\n') {
                return self.fail(WalReadError::Corrupted {
                    line: self.line_number,
                    reason: "incomplete line".to_string(),
                });
            }

            let entry = match WalEntry::from_line(trimmed) {
                Ok(entry) => entry,
                Err(e) => {
                    let line = self.line_number;
                    return self.fail(WalReadError::Corrupted {
                        line,
                        reason: e.to_string(),
                    });
                }
            };
            if !entry.verify() {
                let line = self.line_number;
                return self.fail(WalReadError::ChecksumMismatch { line });
            }

            self.last_valid_position = self.position;
            return Some(Ok(entry));
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;

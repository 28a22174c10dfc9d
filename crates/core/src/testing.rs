// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared by the unit tests of this crate

use crate::attributes::{AttributeReader, LocalAttributeReader, PathSnapshot};
use crate::error::FileError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One scripted answer for a path
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Size(u64),
    Missing,
}

/// Attribute reader that overrides sizes for scripted paths
///
/// Unscripted paths are read from disk. The last step of a script repeats.
#[derive(Clone, Default)]
pub struct ScriptedReader {
    scripts: Arc<Mutex<HashMap<PathBuf, VecDeque<Step>>>>,
    reads: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, path: &Path, steps: &[Step]) {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), steps.iter().copied().collect());
    }

    pub fn reads_of(&self, path: &Path) -> usize {
        self.reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| p.as_path() == path)
            .count()
    }

    fn next_step(&self, path: &Path) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let steps = scripts.get_mut(path)?;
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().copied()
        }
    }
}

impl AttributeReader for ScriptedReader {
    fn read(&self, path: &Path) -> Result<PathSnapshot, FileError> {
        self.reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_path_buf());

        match self.next_step(path) {
            None => LocalAttributeReader.read(path),
            Some(Step::Missing) => Err(FileError::NotFound {
                path: path.to_path_buf(),
            }),
            Some(Step::Size(size)) => {
                let mut snap = LocalAttributeReader
                    .read(path)
                    .unwrap_or_else(|_| file_snapshot(path, 0, DateTime::UNIX_EPOCH));
                snap.size = size;
                Ok(snap)
            }
        }
    }
}

/// Synthetic regular-file snapshot with all timestamps set to `at`
pub fn file_snapshot(path: &Path, size: u64, at: DateTime<Utc>) -> PathSnapshot {
    PathSnapshot {
        path: path.to_path_buf(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size,
        is_directory: false,
        is_regular_file: true,
        is_symlink: false,
        created_at: at,
        modified_at: at,
        accessed_at: at,
    }
}

/// Set a file's modification time
pub fn set_modified(path: &Path, at: DateTime<Utc>) {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .unwrap_or_else(|e| panic!("open {}: {e}", path.display()));
    file.set_modified(at.into())
        .unwrap_or_else(|e| panic!("set_modified {}: {e}", path.display()));
}

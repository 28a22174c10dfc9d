// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for producing delivered items in tests

use fpoll_core::{
    DirectoryListener, InFlightTracker, ListenerConfig, LocalConnectionProvider, MemoryStore,
    PollItemStatus, PollSink, PolledFile, Rejected,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
pub struct Collector {
    pub items: Vec<PolledFile>,
}

impl PollSink for Collector {
    fn accept(&mut self, item: PolledFile) -> Result<PollItemStatus, Rejected> {
        self.items.push(item);
        Ok(PollItemStatus::Accepted)
    }
}

/// A started listener over `<dir>/in`
pub fn listener(dir: &Path, config: ListenerConfig) -> DirectoryListener<LocalConnectionProvider> {
    let store = Arc::new(MemoryStore::new(100));
    let provider = LocalConnectionProvider::new(Some(dir.to_path_buf()));
    let mut listener =
        DirectoryListener::new(config, provider, store.clone(), InFlightTracker::new(store))
            .unwrap();
    listener.start().unwrap();
    listener
}

/// A temp dir holding `in/<name>` with `content`
pub fn drop_dir(name: &str, content: &[u8]) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    std::fs::write(dir.path().join("in").join(name), content).unwrap();
    dir
}

/// Deliver the single file in `<dir>/in`
pub fn deliver_one(dir: &Path, config: ListenerConfig) -> PolledFile {
    let mut listener = listener(dir, config);
    let mut sink = Collector::default();
    listener.poll(&mut sink);
    assert_eq!(sink.items.len(), 1, "expected exactly one delivered file");
    sink.items.remove(0)
}

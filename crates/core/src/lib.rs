// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! fpoll-core: local filesystem connector
//!
//! This crate provides:
//! - File operations rooted at a working directory (list, read, write,
//!   copy, move, rename, delete, create directory)
//! - Advisory locks and lazily opened, lock-bound file content
//! - Attribute matching, sorting and paging of listings
//! - A directory listener that delivers new, fully written files exactly
//!   once, with watermarks, in-flight tracking and post actions

pub mod attributes;
pub mod clock;
pub mod content;
pub mod error;
pub mod fs;
pub mod inflight;
pub mod listener;
pub mod lock;
pub mod matcher;
pub mod post_action;
pub mod stability;
pub mod stop;
pub mod store;
pub mod subset;
pub mod walker;
pub mod watermark;

#[cfg(test)]
pub(crate) mod testing;

pub use attributes::{AttributeReader, LocalAttributeReader, PathSnapshot};
pub use clock::{Clock, FakeClock, SystemClock};
pub use content::FileContent;
pub use error::FileError;
pub use fs::{
    ConnectionProvider, LocalConnectionProvider, LocalFileSystem, LockMode, ReadOptions,
    TransferOptions, WriteMode, WriteOptions,
};
pub use inflight::InFlightTracker;
pub use listener::{
    DirectoryListener, ListenerConfig, PollError, PollItemStatus, PollPhase, PollReport,
    PollSink, PolledFile, Rejected,
};
pub use lock::{PathLock, ReadGuard, Release};
pub use matcher::{MatchCriteria, MatchPolicy, Matcher};
pub use post_action::{Outcome, PostAction, PostActionConfig, PostActionPolicy};
pub use stop::StopSignal;
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use subset::{SortCriteria, SortOrder, SubsetSpec};
pub use walker::Listing;
pub use watermark::{WatermarkMode, WatermarkStore};

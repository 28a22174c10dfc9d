// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! fpoll-storage: durable key-value store for listener state
//!
//! Watermarks must survive a restart. [`WalStore`] keeps them in an
//! append-only JSONL log with per-entry CRC32 checksums, replayed on open.

mod entry;
mod reader;
mod state;
mod store;
mod writer;

pub use entry::{StoreOp, WalEntry};
pub use reader::{WalEntryIter, WalReadError, WalReader};
pub use state::{MaterializedState, StoredValue};
pub use store::{CompactionResult, WalStore, DEFAULT_COMPACTION_THRESHOLD};
pub use writer::WalWriter;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fpoll-daemon: runs directory listeners on a schedule and processes
//! the files they deliver.

pub mod config;
pub mod lifecycle;
pub mod processor;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, DaemonConfig, HandlerConfig, ListenerToml};
pub use lifecycle::{startup, Daemon, LifecycleError, Paths};
pub use processor::{Handler, Job, ProcessError};
pub use scheduler::{ChannelSink, Schedule, ScheduledListener};

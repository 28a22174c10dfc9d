// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-period polling
//!
//! Each listener gets one task that polls on its own schedule. A poll runs
//! on the blocking pool and the listener moves into it and back, so polls
//! of one listener never overlap.

use std::sync::Arc;
use std::time::Duration;

use fpoll_core::{
    DirectoryListener, LocalConnectionProvider, PollItemStatus, PollSink, PolledFile, Rejected,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::processor::{Handler, Job};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub frequency: Duration,
    pub start_delay: Duration,
}

/// A started listener with its schedule and handler
pub struct ScheduledListener {
    pub listener: DirectoryListener<LocalConnectionProvider>,
    pub schedule: Schedule,
    pub handler: Arc<Handler>,
}

/// Forwards polled files to the processor
pub struct ChannelSink {
    listener: String,
    handler: Arc<Handler>,
    jobs: mpsc::Sender<Job>,
}

impl ChannelSink {
    pub fn new(listener: impl Into<String>, handler: Arc<Handler>, jobs: mpsc::Sender<Job>) -> Self {
        Self {
            listener: listener.into(),
            handler,
            jobs,
        }
    }
}

impl PollSink for ChannelSink {
    fn is_stopping(&self) -> bool {
        self.jobs.is_closed()
    }

    /// Blocks while the processor is saturated
    fn accept(&mut self, item: PolledFile) -> Result<PollItemStatus, Rejected> {
        let job = Job {
            listener: self.listener.clone(),
            item,
            handler: Arc::clone(&self.handler),
        };
        match self.jobs.blocking_send(job) {
            Ok(()) => Ok(PollItemStatus::Accepted),
            Err(mpsc::error::SendError(job)) => {
                Err(Rejected::new(job.item, "processing pipeline is closed"))
            }
        }
    }
}

/// Spawn one polling task per listener
pub fn spawn_all(
    listeners: Vec<ScheduledListener>,
    jobs: &mpsc::Sender<Job>,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    listeners
        .into_iter()
        .map(|scheduled| tokio::spawn(run_listener(scheduled, jobs.clone(), shutdown.clone())))
        .collect()
}

/// Poll one listener until shutdown
pub async fn run_listener(
    scheduled: ScheduledListener,
    jobs: mpsc::Sender<Job>,
    mut shutdown: watch::Receiver<bool>,
) {
    let ScheduledListener {
        mut listener,
        schedule,
        handler,
    } = scheduled;
    let name = listener.name().to_string();

    if !schedule.start_delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(schedule.start_delay) => {}
            _ = shutdown.changed() => {}
        }
    }

    let mut ticker = tokio::time::interval(schedule.frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let mut sink = ChannelSink::new(&name, Arc::clone(&handler), jobs.clone());
        let polled = tokio::task::spawn_blocking(move || {
            let report = listener.poll(&mut sink);
            (listener, report)
        })
        .await;

        match polled {
            Ok((returned, report)) => {
                listener = returned;
                if report.delivered > 0 || report.aborted {
                    debug!(
                        listener = %name,
                        delivered = report.delivered,
                        aborted = report.aborted,
                        "poll complete"
                    );
                }
            }
            Err(e) => {
                error!(listener = %name, error = %e, "poll task failed, listener stopped");
                return;
            }
        }
    }

    listener.stop();
    info!(listener = %name, "polling stopped");
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

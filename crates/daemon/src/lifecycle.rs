// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fpoll_core::{
    DirectoryListener, FileError, InFlightTracker, KeyValueStore, LocalConnectionProvider,
    MemoryStore, StopSignal, StoreError,
};
use fpoll_storage::WalStore;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, DaemonConfig};
use crate::processor::Handler;
use crate::scheduler::{Schedule, ScheduledListener};

/// Filesystem locations owned by one daemon instance
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    pub wal_path: PathBuf,
}

impl Paths {
    /// Locations for the daemon configured by `config_path`
    ///
    /// An explicit `state_dir` is used as is. Otherwise each config file
    /// gets its own directory under the user state dir, so daemons for
    /// different configs never share a lock.
    pub fn resolve(config: &DaemonConfig, config_path: &Path) -> Result<Self, LifecycleError> {
        let state_dir = match &config.state_dir {
            Some(dir) => dir.clone(),
            None => {
                let canonical = config_path
                    .canonicalize()
                    .map_err(|e| LifecycleError::ConfigNotFound(config_path.to_path_buf(), e))?;
                state_dir()?.join("instances").join(config_hash(&canonical))
            }
        };
        Ok(Self::in_dir(state_dir))
    }

    pub fn in_dir(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("fpolld.pid"),
            wal_path: state_dir.join("state.wal"),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config not found at {0}: {1}")]
    ConfigNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Listener '{name}' failed to start: {source}")]
    Listener {
        name: String,
        #[source]
        source: FileError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state between startup and shutdown
pub struct Daemon {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    listeners: Vec<ScheduledListener>,
    stops: Vec<StopSignal>,
    /// In-flight markers
    pub inflight: Arc<MemoryStore>,
    /// Watermarks
    pub watermarks: Arc<WalStore>,
    pub start_time: Instant,
}

impl Daemon {
    /// Hand the listeners over to the scheduler; callable once
    pub fn take_listeners(&mut self) -> Vec<ScheduledListener> {
        std::mem::take(&mut self.listeners)
    }

    /// Raise every listener's stop signal
    pub fn request_stop(&self) {
        for stop in &self.stops {
            stop.request_stop();
        }
    }

    /// Expire stale in-flight markers and watermark entries
    pub fn sweep(&self) -> usize {
        self.inflight.sweep() + self.watermarks.sweep()
    }

    /// Remove the PID file; the lock is released when `self` drops
    pub fn shutdown(&mut self) {
        info!("Shutting down daemon...");
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
    }
}

/// Start the daemon
pub fn startup(config: &DaemonConfig, paths: &Paths) -> Result<Daemon, LifecycleError> {
    match startup_inner(config, paths) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            cleanup_on_failure(paths, &e);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
fn startup_inner(config: &DaemonConfig, paths: &Paths) -> Result<Daemon, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&paths.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing state
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Open stores
    let watermarks = Arc::new(WalStore::open(&paths.wal_path)?);
    let inflight = Arc::new(MemoryStore::new(config.inflight.max_entries));
    let tracker = InFlightTracker::new(inflight.clone()).with_ttl(config.inflight.ttl);

    // 4. Build and start every listener; any failure is fatal
    let provider = LocalConnectionProvider::new(config.working_dir.clone());
    let mut listeners = Vec::with_capacity(config.listeners.len());
    let mut stops = Vec::with_capacity(config.listeners.len());
    for entry in &config.listeners {
        let listener_config = entry.to_listener_config()?;
        let listener_err = |source| LifecycleError::Listener {
            name: entry.name.clone(),
            source,
        };
        let watermark_store: Arc<dyn KeyValueStore> = watermarks.clone();
        let mut listener = DirectoryListener::new(
            listener_config,
            provider.clone(),
            watermark_store,
            tracker.clone(),
        )
        .map_err(listener_err)?;
        listener.start().map_err(listener_err)?;

        stops.push(listener.stop_signal());
        listeners.push(ScheduledListener {
            listener,
            schedule: Schedule {
                frequency: entry.frequency,
                start_delay: entry.start_delay,
            },
            handler: Arc::new(Handler::from_config(&entry.handler)),
        });
    }

    info!(
        state_dir = %paths.state_dir.display(),
        listeners = listeners.len(),
        "Daemon started"
    );

    Ok(Daemon {
        paths: paths.clone(),
        lock_file,
        listeners,
        stops,
        inflight,
        watermarks,
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths, error: &LifecycleError) {
    // Another daemon owns the PID file
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Get the state directory for fpoll
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fpoll"));
    }

    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/fpoll"))
}

/// Compute config hash for a unique daemon directory
fn config_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    hex_encode(&result[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

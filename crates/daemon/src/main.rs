// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File Poll Daemon (fpolld)
//!
//! Watches configured directories and hands each new, fully written file
//! to its listener's handler exactly once.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use fpoll_core::{LocalFileSystem, MatchCriteria, Matcher, SortCriteria, SortOrder, SubsetSpec};
use fpoll_daemon::config::DaemonConfig;
use fpoll_daemon::lifecycle::{self, LifecycleError, Paths};
use fpoll_daemon::{processor, scheduler};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "fpolld", version, about = "Local directory polling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daemon in the foreground
    Run {
        /// Configuration file
        #[arg(short, long, default_value = "fpoll.toml")]
        config: PathBuf,
    },
    /// List a directory the way a listener sees it
    List {
        directory: PathBuf,
        /// Base for a relative directory; the current directory by default
        #[arg(long)]
        working_dir: Option<PathBuf>,
        #[arg(short, long)]
        recursive: bool,
        /// Glob, or `regex:` followed by a regular expression
        #[arg(long)]
        name_pattern: Option<String>,
        #[arg(long)]
        sort: Option<SortCriteria>,
        #[arg(long, default_value_t = SortOrder::Asc)]
        order: SortOrder,
        /// Number of entries to skip after sorting
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Maximum entries to print; 0 for all
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Run { config } => run(&config),
        Command::List {
            directory,
            working_dir,
            recursive,
            name_pattern,
            sort,
            order,
            offset,
            limit,
        } => {
            let base = match working_dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let mut criteria = MatchCriteria::new();
            if let Some(pattern) = name_pattern {
                criteria = criteria.with_name_pattern(pattern);
            }
            let matcher = Matcher::compile(&criteria, Utc::now())?;
            let subset = SubsetSpec::new()
                .with_offset(offset)
                .with_limit(limit)
                .sorted_by(sort.unwrap_or(SortCriteria::Path), order);

            let fs = LocalFileSystem::new(base);
            for listing in fs.list(&directory, recursive, &matcher, Some(&subset))? {
                let kind = if listing.snapshot.is_directory { "d" } else { "-" };
                println!(
                    "{} {:>10} {} {}",
                    kind,
                    listing.snapshot.size,
                    listing.snapshot.modified_at.format("%Y-%m-%dT%H:%M:%SZ"),
                    listing.path().display()
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::load(config_path)?;
    let paths = Paths::resolve(&config, config_path)?;

    // Write startup marker before tracing setup so it leads the attempt
    if let Some(log_file) = &config.log_file {
        write_startup_marker(log_file)?;
    }
    let log_guard = setup_logging(config.log_file.as_deref())?;

    info!("Starting fpolld with config: {}", config_path.display());

    let mut daemon = match lifecycle::startup(&config, &paths) {
        Ok(d) => d,
        Err(e) => {
            // Non-blocking tracing may not flush before exit
            if let Some(log_file) = &config.log_file {
                write_startup_error(log_file, &e);
            }
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity);
    let processor = tokio::spawn(processor::run(jobs_rx, config.max_running_jobs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pollers = scheduler::spawn_all(daemon.take_listeners(), &jobs_tx, &shutdown_rx);
    // Pollers hold the remaining senders; the processor drains once they exit
    drop(jobs_tx);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sweep = tokio::time::interval(config.inflight.sweep_interval);

    info!(listeners = pollers.len(), "Daemon ready");

    // Signal ready for a supervising parent process
    println!("READY");

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                daemon.sweep();
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.request_stop();
    let _ = shutdown_tx.send(true);
    for poller in pollers {
        if let Err(e) = poller.await {
            warn!("Polling task failed: {}", e);
        }
    }
    match processor.await {
        Ok(processed) => info!(processed, "Processor stopped"),
        Err(e) => warn!("Processor task failed: {}", e),
    }

    daemon.shutdown();
    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- fpolld: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fpolld: starting (pid: ";

/// Append a startup marker to the log file
fn write_startup_marker(log_file: &Path) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write a startup error synchronously to the log file
fn write_startup_error(log_file: &Path, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

/// Log to `log_file` when set, otherwise to stderr
fn setup_logging(
    log_file: Option<&Path>,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().ok_or(LifecycleError::NoStateDir)?;
            std::fs::create_dir_all(dir)?;
            let name = path.file_name().ok_or(LifecycleError::NoStateDir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

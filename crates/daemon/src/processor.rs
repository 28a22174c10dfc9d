// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processing of delivered files
//!
//! Polls hand items to [`run`] over a bounded channel. Each item is
//! processed on the blocking pool, then completed, which applies its post
//! action and clears its in-flight marker.

use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;

use fpoll_core::{Outcome, PolledFile};
use minijinja::{context, Environment};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::HandlerConfig;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("template error in '{template}': {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("could not read content: {0}")]
    Content(#[source] io::Error),

    #[error("content already closed")]
    Closed,
}

/// Handler resolved from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    Log,
    Command { program: String, args: Vec<String> },
}

impl Handler {
    pub fn from_config(config: &HandlerConfig) -> Self {
        match config {
            HandlerConfig::Log => Handler::Log,
            HandlerConfig::Command { program, args } => Handler::Command {
                program: program.clone(),
                args: args.clone(),
            },
        }
    }

    /// Consume the item's content; returns the bytes read
    pub fn run(&self, item: &mut PolledFile) -> Result<u64, ProcessError> {
        match self {
            Handler::Log => {
                let content = item.content().ok_or(ProcessError::Closed)?;
                io::copy(content, &mut io::sink()).map_err(ProcessError::Content)
            }
            Handler::Command { program, args } => {
                let args = render_args(item, args)?;
                run_command(item, program, &args)
            }
        }
    }
}

/// Render each argument as a template over the item's attributes
pub fn render_args(item: &PolledFile, args: &[String]) -> Result<Vec<String>, ProcessError> {
    let snapshot = item.snapshot();
    let env = Environment::new();
    let ctx = context! {
        path => snapshot.path.display().to_string(),
        name => snapshot.name.clone(),
        size => snapshot.size,
        modified => snapshot.modified_at.to_rfc3339(),
        created => snapshot.created_at.to_rfc3339(),
    };
    args.iter()
        .map(|template| {
            env.render_str(template, &ctx)
                .map_err(|source| ProcessError::Template {
                    template: template.clone(),
                    source,
                })
        })
        .collect()
}

fn run_command(item: &mut PolledFile, program: &str, args: &[String]) -> Result<u64, ProcessError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let copied = match (child.stdin.take(), item.content()) {
        (Some(mut stdin), Some(content)) => pipe(content, &mut stdin),
        (_, None) => Err(ProcessError::Closed),
        (None, Some(_)) => Ok(0),
    };
    let copied = match copied {
        Ok(n) => n,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
    };

    let status = child.wait().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(ProcessError::Exit {
            program: program.to_string(),
            status,
        });
    }
    Ok(copied)
}

/// Copy content to a child's stdin; the child may stop reading early
///
/// Returns the bytes the child accepted, which is short of the content
/// length when it closed stdin first.
fn pipe(content: &mut impl Read, stdin: &mut impl Write) -> Result<u64, ProcessError> {
    let mut buf = [0u8; 8 * 1024];
    let mut copied = 0u64;
    loop {
        let n = match content.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProcessError::Content(e)),
        };
        let mut chunk = &buf[..n];
        while !chunk.is_empty() {
            match stdin.write(chunk) {
                Ok(0) => return Ok(stopped_reading(copied)),
                Ok(written) => {
                    copied += written as u64;
                    chunk = &chunk[written..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    return Ok(stopped_reading(copied))
                }
                Err(e) => return Err(ProcessError::Content(e)),
            }
        }
    }
}

fn stopped_reading(copied: u64) -> u64 {
    debug!(copied, "command closed stdin before reading all content");
    copied
}

/// A delivered item on its way to a handler
#[derive(Debug)]
pub struct Job {
    pub listener: String,
    pub item: PolledFile,
    pub handler: Arc<Handler>,
}

/// Run a job's handler and complete its item
pub fn process(job: Job) -> Outcome {
    let Job {
        listener,
        mut item,
        handler,
    } = job;
    let job_id = Uuid::new_v4();
    let span = info_span!(
        "job",
        %job_id,
        listener = %listener,
        path = %item.path().display()
    );
    let _enter = span.enter();

    let outcome = match handler.run(&mut item) {
        Ok(bytes) => {
            info!(bytes, "processed file");
            Outcome::Success
        }
        Err(e) => {
            warn!(error = %e, "processing failed");
            Outcome::Failure
        }
    };

    if let Err(e) = item.complete(outcome) {
        error!(error = %e, %outcome, "post action failed");
    }
    outcome
}

/// Process jobs until every sender is gone and running jobs have finished
///
/// At most `max_running` handlers run at once. While that many are busy no
/// job is taken off the channel, so a full channel blocks the pollers.
/// Returns the number of jobs processed.
pub async fn run(mut jobs: mpsc::Receiver<Job>, max_running: usize) -> usize {
    let max_running = max_running.max(1);
    let mut running = JoinSet::new();
    let mut processed = 0usize;

    loop {
        tokio::select! {
            job = jobs.recv(), if running.len() < max_running => match job {
                Some(job) => {
                    running.spawn_blocking(move || process(job));
                }
                None => break,
            },
            Some(result) = running.join_next(), if !running.is_empty() => {
                record(result, &mut processed);
            }
        }
    }

    while let Some(result) = running.join_next().await {
        record(result, &mut processed);
    }
    info!(processed, "processor drained");
    processed
}

fn record(result: Result<Outcome, tokio::task::JoinError>, processed: &mut usize) {
    match result {
        Ok(_) => *processed += 1,
        Err(e) => error!("processing task failed: {}", e),
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! ```toml
//! working_dir = "/srv/drop"
//!
//! [inflight]
//! ttl = "60s"
//!
//! [[listener]]
//! name = "invoices"
//! directory = "incoming/invoices"
//! frequency = "5s"
//! watermark = "modified"
//! size_check_interval = "500ms"
//! move_to_directory = "processed"
//! lock = { timeout = "2s" }
//!
//! [listener.matcher]
//! name_pattern = "*.csv"
//!
//! [listener.handler]
//! kind = "command"
//! program = "import-invoice"
//! args = ["--name", "{{ name }}"]
//! ```

use fpoll_core::{
    FileError, ListenerConfig, LockMode, MatchCriteria, PostActionConfig, WatermarkMode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("listener '{listener}': {source}")]
    Listener {
        listener: String,
        #[source]
        source: FileError,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Base for relative listener directories; the home directory if unset
    pub working_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// Delivered items buffered ahead of the processor
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Handlers allowed to run at once
    #[serde(default = "default_max_running_jobs")]
    pub max_running_jobs: usize,
    #[serde(default)]
    pub inflight: InFlightLimits,
    #[serde(default, rename = "listener")]
    pub listeners: Vec<ListenerToml>,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_max_running_jobs() -> usize {
    4
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            state_dir: None,
            log_file: None,
            queue_capacity: default_queue_capacity(),
            max_running_jobs: default_max_running_jobs(),
            inflight: InFlightLimits::default(),
            listeners: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InFlightLimits {
    pub max_entries: usize,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for InFlightLimits {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: fpoll_core::inflight::DEFAULT_INFLIGHT_TTL,
            sweep_interval: Duration::from_secs(20),
        }
    }
}

/// One `[[listener]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerToml {
    pub name: String,
    pub directory: PathBuf,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default = "default_frequency", with = "humantime_serde")]
    pub frequency: Duration,
    #[serde(default, with = "humantime_serde")]
    pub start_delay: Duration,
    #[serde(default)]
    pub watermark: WatermarkMode,
    #[serde(default, with = "humantime_serde")]
    pub size_check_interval: Option<Duration>,
    #[serde(default)]
    pub lock: Option<LockToml>,
    #[serde(default)]
    pub matcher: Option<MatchCriteria>,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(flatten)]
    pub post_action: PostActionConfig,
}

fn default_true() -> bool {
    true
}

fn default_frequency() -> Duration {
    Duration::from_secs(1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockToml {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Duration,
}

/// What to do with each delivered file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum HandlerConfig {
    /// Read the content and log its size
    #[default]
    Log,
    /// Pipe the content to a program; exit status 0 is success
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Config(err) => err,
        })
    }

    /// Parse and validate configuration text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            },
            ParseFailure::Config(err) => err,
        })
    }

    fn parse(text: &str) -> Result<Self, ParseFailure> {
        let config: DaemonConfig = toml::from_str(text).map_err(ParseFailure::Toml)?;
        config.validate().map_err(ParseFailure::Config)?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        if self.max_running_jobs == 0 {
            return Err(ConfigError::Invalid("max_running_jobs must be at least 1".into()));
        }
        if self.inflight.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "inflight.sweep_interval must be greater than zero".into(),
            ));
        }
        let mut names = HashSet::new();
        for listener in &self.listeners {
            if !names.insert(listener.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate listener name '{}'",
                    listener.name
                )));
            }
            if listener.frequency.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "listener '{}': frequency must be greater than zero",
                    listener.name
                )));
            }
            listener.to_listener_config()?;
        }
        Ok(())
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Config(ConfigError),
}

impl ListenerToml {
    /// Convert to the core listener configuration
    ///
    /// Post-action flags are checked here so that bad combinations fail
    /// at startup.
    pub fn to_listener_config(&self) -> Result<ListenerConfig, ConfigError> {
        let post_action = self
            .post_action
            .build()
            .map_err(|source| ConfigError::Listener {
                listener: self.name.clone(),
                source,
            })?;

        let mut config = ListenerConfig::new(&self.name, &self.directory)
            .with_recursive(self.recursive)
            .with_watermark(self.watermark)
            .with_post_action(post_action);
        if let Some(interval) = self.size_check_interval {
            config = config.with_size_check(interval);
        }
        if let Some(lock) = &self.lock {
            config = config.with_lock(LockMode::Locked {
                timeout: lock.timeout,
            });
        }
        if let Some(criteria) = &self.matcher {
            config = config.with_matcher(criteria.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

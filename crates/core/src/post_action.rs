// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal action applied to a delivered file
//!
//! The flat configuration flags are validated once into a [`PostAction`]
//! variant so that conflicting combinations cannot reach a poll.

use crate::attributes::PathSnapshot;
use crate::error::FileError;
use crate::fs::{LocalFileSystem, TransferOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How processing of a delivered item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PostAction {
    #[default]
    None,
    Delete,
    Move {
        directory: PathBuf,
        rename_to: Option<String>,
        overwrite: bool,
    },
    Rename {
        to: String,
        overwrite: bool,
    },
}

impl PostAction {
    pub fn apply(&self, fs: &LocalFileSystem, snapshot: &PathSnapshot) -> Result<(), FileError> {
        match self {
            PostAction::None => Ok(()),
            PostAction::Delete => fs.delete(&snapshot.path),
            PostAction::Move {
                directory,
                rename_to,
                overwrite,
            } => {
                let mut options = TransferOptions::new()
                    .overwrite(*overwrite)
                    .create_parent_dirs(true);
                options.rename_to = rename_to.clone();
                fs.move_path(&snapshot.path, directory, &options).map(|_| ())
            }
            PostAction::Rename { to, overwrite } => {
                fs.rename(&snapshot.path, to, *overwrite).map(|_| ())
            }
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostAction::None => write!(f, "none"),
            PostAction::Delete => write!(f, "delete"),
            PostAction::Move { directory, .. } => write!(f, "move to {}", directory.display()),
            PostAction::Rename { to, .. } => write!(f, "rename to {}", to),
        }
    }
}

/// Action plus whether it also runs after a failed processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostActionPolicy {
    pub action: PostAction,
    pub apply_when_failed: bool,
}

impl Default for PostActionPolicy {
    fn default() -> Self {
        Self {
            action: PostAction::None,
            apply_when_failed: true,
        }
    }
}

impl PostActionPolicy {
    pub fn new(action: PostAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_apply_when_failed(mut self, apply: bool) -> Self {
        self.apply_when_failed = apply;
        self
    }

    pub fn applies_to(&self, outcome: Outcome) -> bool {
        outcome == Outcome::Success || self.apply_when_failed
    }
}

/// Post-action flags as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostActionConfig {
    pub auto_delete: bool,
    pub move_to_directory: Option<PathBuf>,
    pub rename_to: Option<String>,
    pub overwrite: bool,
    pub apply_post_action_when_failed: bool,
}

impl Default for PostActionConfig {
    fn default() -> Self {
        Self {
            auto_delete: false,
            move_to_directory: None,
            rename_to: None,
            overwrite: false,
            apply_post_action_when_failed: true,
        }
    }
}

impl PostActionConfig {
    /// Validate the flags into a policy
    pub fn build(&self) -> Result<PostActionPolicy, FileError> {
        let rename_to = self
            .rename_to
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(name) = rename_to {
            let bare = Path::new(name).file_name().is_some_and(|n| n == name);
            if !bare {
                return Err(FileError::InvalidConfiguration(format!(
                    "rename_to '{name}' must be a file name, not a path"
                )));
            }
        }

        let action = match (self.auto_delete, &self.move_to_directory, rename_to) {
            (true, Some(_), _) => {
                return Err(FileError::InvalidConfiguration(
                    "auto_delete and move_to_directory cannot both be set".into(),
                ));
            }
            (true, None, Some(_)) => {
                return Err(FileError::InvalidConfiguration(
                    "auto_delete and rename_to cannot both be set".into(),
                ));
            }
            (true, None, None) => PostAction::Delete,
            (false, Some(directory), rename_to) => PostAction::Move {
                directory: directory.clone(),
                rename_to: rename_to.map(str::to_string),
                overwrite: self.overwrite,
            },
            (false, None, Some(to)) => PostAction::Rename {
                to: to.to_string(),
                overwrite: self.overwrite,
            },
            (false, None, None) => PostAction::None,
        };

        Ok(PostActionPolicy {
            action,
            apply_when_failed: self.apply_post_action_when_failed,
        })
    }
}

#[cfg(test)]
#[path = "post_action_tests.rs"]
mod tests;

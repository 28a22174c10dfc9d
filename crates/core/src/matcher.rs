// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Predicates over path snapshots
//!
//! [`MatchCriteria`] is the configured value; [`Matcher::compile`] turns it
//! into a list of clauses evaluated against one fixed reference instant.
//! Absent criteria add no clause.

use crate::attributes::PathSnapshot;
use crate::error::FileError;
use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a file-type flag constrains a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The flag must be set
    Require,
    /// No constraint
    #[default]
    Include,
    /// The flag must not be set
    Exclude,
}

impl MatchPolicy {
    fn accepts(self, flag: bool) -> bool {
        match self {
            MatchPolicy::Require => flag,
            MatchPolicy::Include => true,
            MatchPolicy::Exclude => !flag,
        }
    }
}

/// Configured match criteria
///
/// Patterns are globs unless prefixed with `regex:`; a `glob:` prefix is
/// accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchCriteria {
    pub name_pattern: Option<String>,
    pub path_pattern: Option<String>,
    pub regular_files: MatchPolicy,
    pub directories: MatchPolicy,
    pub symlinks: MatchPolicy,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub created_since: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
    pub updated_since: Option<DateTime<Utc>>,
    pub updated_until: Option<DateTime<Utc>>,
    pub accessed_since: Option<DateTime<Utc>>,
    pub accessed_until: Option<DateTime<Utc>>,
    #[serde(with = "humantime_serde")]
    pub updated_in_last: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub not_updated_in_last: Option<Duration>,
}

impl MatchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn with_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn with_regular_files(mut self, policy: MatchPolicy) -> Self {
        self.regular_files = policy;
        self
    }

    pub fn with_directories(mut self, policy: MatchPolicy) -> Self {
        self.directories = policy;
        self
    }

    pub fn with_symlinks(mut self, policy: MatchPolicy) -> Self {
        self.symlinks = policy;
        self
    }

    pub fn with_size_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_created_window(
        mut self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_since = since;
        self.created_until = until;
        self
    }

    pub fn with_updated_window(
        mut self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.updated_since = since;
        self.updated_until = until;
        self
    }

    pub fn with_accessed_window(
        mut self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.accessed_since = since;
        self.accessed_until = until;
        self
    }

    pub fn with_updated_in_last(mut self, duration: Duration) -> Self {
        self.updated_in_last = Some(duration);
        self
    }

    pub fn with_not_updated_in_last(mut self, duration: Duration) -> Self {
        self.not_updated_in_last = Some(duration);
        self
    }
}

/// A compiled name or path pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, FileError> {
        if let Some(expr) = source.strip_prefix("regex:") {
            let anchored = format!("^(?:{expr})$");
            return Regex::new(&anchored).map(Pattern::Regex).map_err(|e| {
                FileError::InvalidConfiguration(format!("invalid regex '{expr}': {e}"))
            });
        }
        let glob = source.strip_prefix("glob:").unwrap_or(source);
        GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map(|g| Pattern::Glob(g.compile_matcher()))
            .map_err(|e| FileError::InvalidConfiguration(format!("invalid glob '{glob}': {e}")))
    }

    pub fn is_match(&self, candidate: &Path) -> bool {
        match self {
            Pattern::Glob(glob) => glob.is_match(candidate),
            Pattern::Regex(regex) => regex.is_match(&candidate.to_string_lossy()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeField {
    Created,
    Modified,
    Accessed,
}

impl TimeField {
    fn of(self, snapshot: &PathSnapshot) -> DateTime<Utc> {
        match self {
            TimeField::Created => snapshot.created_at,
            TimeField::Modified => snapshot.modified_at,
            TimeField::Accessed => snapshot.accessed_at,
        }
    }
}

#[derive(Debug, Clone)]
enum Clause {
    Name(Pattern),
    Path(Pattern),
    Kind {
        regular: MatchPolicy,
        directory: MatchPolicy,
        symlink: MatchPolicy,
    },
    MinSize(u64),
    MaxSize(u64),
    /// Field at or after the bound
    Since(TimeField, DateTime<Utc>),
    /// Field at or before the bound
    Until(TimeField, DateTime<Utc>),
}

impl Clause {
    fn test(&self, snapshot: &PathSnapshot) -> bool {
        match self {
            Clause::Name(pattern) => pattern.is_match(Path::new(&snapshot.name)),
            Clause::Path(pattern) => pattern.is_match(&snapshot.path),
            Clause::Kind {
                regular,
                directory,
                symlink,
            } => {
                regular.accepts(snapshot.is_regular_file)
                    && directory.accepts(snapshot.is_directory)
                    && symlink.accepts(snapshot.is_symlink)
            }
            Clause::MinSize(min) => snapshot.size >= *min,
            Clause::MaxSize(max) => snapshot.size <= *max,
            Clause::Since(field, bound) => field.of(snapshot) >= *bound,
            Clause::Until(field, bound) => field.of(snapshot) <= *bound,
        }
    }
}

/// Compiled predicate; every clause must accept
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    clauses: Vec<Clause>,
}

impl Matcher {
    /// Matcher with no clauses
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Compile criteria against a single reference instant
    ///
    /// `now` anchors `updated_in_last` and `not_updated_in_last`, so every
    /// file tested by this matcher sees the same boundary.
    pub fn compile(criteria: &MatchCriteria, now: DateTime<Utc>) -> Result<Self, FileError> {
        let mut clauses = Vec::new();

        if let Some(p) = &criteria.name_pattern {
            clauses.push(Clause::Name(Pattern::parse(p)?));
        }
        if let Some(p) = &criteria.path_pattern {
            clauses.push(Clause::Path(Pattern::parse(p)?));
        }
        let kinds = [criteria.regular_files, criteria.directories, criteria.symlinks];
        if kinds.iter().any(|p| *p != MatchPolicy::Include) {
            clauses.push(Clause::Kind {
                regular: criteria.regular_files,
                directory: criteria.directories,
                symlink: criteria.symlinks,
            });
        }
        if let Some(min) = criteria.min_size {
            clauses.push(Clause::MinSize(min));
        }
        if let Some(max) = criteria.max_size {
            clauses.push(Clause::MaxSize(max));
        }

        let windows = [
            (TimeField::Created, criteria.created_since, criteria.created_until),
            (TimeField::Modified, criteria.updated_since, criteria.updated_until),
            (TimeField::Accessed, criteria.accessed_since, criteria.accessed_until),
        ];
        for (field, since, until) in windows {
            if let Some(since) = since {
                clauses.push(Clause::Since(field, since));
            }
            if let Some(until) = until {
                clauses.push(Clause::Until(field, until));
            }
        }

        if let Some(window) = criteria.updated_in_last {
            clauses.push(Clause::Since(TimeField::Modified, boundary(now, window)?));
        }
        if let Some(window) = criteria.not_updated_in_last {
            clauses.push(Clause::Until(TimeField::Modified, boundary(now, window)?));
        }

        Ok(Self { clauses })
    }

    pub fn test(&self, snapshot: &PathSnapshot) -> bool {
        self.clauses.iter().all(|c| c.test(snapshot))
    }

    pub fn is_accept_all(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn boundary(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, FileError> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .ok_or_else(|| {
            FileError::InvalidConfiguration(format!(
                "time window {} is out of range",
                crate::error::fmt_duration(&window)
            ))
        })
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;

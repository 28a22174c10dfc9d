// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sorting and paging of a finished listing

use crate::attributes::PathSnapshot;
use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Attribute a listing is sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriteria {
    Name,
    #[default]
    Modified,
    Created,
    Size,
    Path,
}

impl SortCriteria {
    fn compare(self, a: &PathSnapshot, b: &PathSnapshot) -> Ordering {
        match self {
            SortCriteria::Name => a.name.cmp(&b.name),
            SortCriteria::Modified => a.modified_at.cmp(&b.modified_at),
            SortCriteria::Created => a.created_at.cmp(&b.created_at),
            SortCriteria::Size => a.size.cmp(&b.size),
            SortCriteria::Path => a.path.cmp(&b.path),
        }
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortCriteria::Name => "name",
            SortCriteria::Modified => "modified",
            SortCriteria::Created => "created",
            SortCriteria::Size => "size",
            SortCriteria::Path => "path",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SortCriteria {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" | "alphabetically" => Ok(SortCriteria::Name),
            "modified" | "date_modified" => Ok(SortCriteria::Modified),
            "created" | "date_created" => Ok(SortCriteria::Created),
            "size" => Ok(SortCriteria::Size),
            "path" => Ok(SortCriteria::Path),
            other => Err(FileError::InvalidConfiguration(format!(
                "unknown sort criteria '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(FileError::InvalidConfiguration(format!(
                "unknown sort order '{other}'"
            ))),
        }
    }
}

/// A view over a completed listing
///
/// `offset` is 0-based: it is the number of leading items skipped after
/// sorting. A `limit` of 0 means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetSpec {
    pub limit: usize,
    pub offset: usize,
    pub criteria: SortCriteria,
    pub order: SortOrder,
}

impl SubsetSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn sorted_by(mut self, criteria: SortCriteria, order: SortOrder) -> Self {
        self.criteria = criteria;
        self.order = order;
        self
    }

    /// Sort (stable), skip `offset`, then keep at most `limit`
    pub fn apply<T: AsRef<PathSnapshot>>(&self, mut items: Vec<T>) -> Vec<T> {
        items.sort_by(|a, b| {
            let ord = self.criteria.compare(a.as_ref(), b.as_ref());
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let limit = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit
        };
        items.into_iter().skip(self.offset).take(limit).collect()
    }
}

#[cfg(test)]
#[path = "subset_tests.rs"]
mod tests;

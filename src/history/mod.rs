// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An append-only record of what has been done to a flag object.


use std::collections::BTreeSet;

use itertools::Itertools;

use crate::constants::VERSION_STR;

/// Provenance entries of a flag object, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    /// Append text to the history. Multi-line text becomes multiple entries,
    /// and blank lines are dropped.
    pub fn push<S: AsRef<str>>(&mut self, text: S) {
        self.entries.extend(
            text.as_ref()
                .lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string()),
        );
    }

    /// Append the crate's version tag, unless it's already somewhere in the
    /// history.
    pub fn add_version(&mut self) {
        if !self.contains(&VERSION_STR) {
            self.entries.push(VERSION_STR.clone());
        }
    }

    /// Append an operation description followed by the version tag.
    pub(crate) fn record<S: AsRef<str>>(&mut self, text: S) {
        self.push(text);
        self.entries.push(VERSION_STR.clone());
    }

    /// Append all of another history's entries.
    pub fn extend(&mut self, other: &History) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.contains(text)) || self.to_string().contains(text)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Are two histories the same, ignoring version tags as well as the order
    /// and repetition of entries?
    pub fn equivalent(&self, other: &History) -> bool {
        fn normalised(h: &History) -> BTreeSet<&str> {
            h.entries
                .iter()
                .map(|e| e.as_str())
                .filter(|e| *e != VERSION_STR.as_str())
                .collect()
        }
        normalised(self) == normalised(other)
    }
}

impl std::fmt::Display for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entries.iter().join("\n"))
    }
}

impl From<&str> for History {
    fn from(s: &str) -> History {
        let mut h = History::new();
        h.push(s);
        h
    }
}

impl From<String> for History {
    fn from(s: String) -> History {
        History::from(s.as_str())
    }
}

impl From<Vec<String>> for History {
    fn from(entries: Vec<String>) -> History {
        History { entries }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-name severity overrides.

use crate::name::ancestors;
use crate::severity::Severity;
use std::collections::HashMap;

/**
Explicit severity overrides, keyed by logger name.

This is a plain data structure; [crate::LoggingContext] owns it behind a reader/writer lock and
keeps the global default level outside of it.  There is at most one entry per name.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeverityTable {
    entries: HashMap<Box<str>, Severity>,
}

impl SeverityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Inserts or overwrites the override for `name`.  [Severity::Unset] removes it.

    Returns the previous override.
    */
    pub fn set(&mut self, name: &str, level: Severity) -> Option<Severity> {
        if level.is_unset() {
            self.entries.remove(name)
        } else if let Some(existing) = self.entries.get_mut(name) {
            Some(std::mem::replace(existing, level))
        } else {
            self.entries.insert(Box::from(name), level);
            None
        }
    }

    /// The override on exactly `name`.
    pub fn get(&self, name: &str) -> Option<Severity> {
        self.entries.get(name).copied()
    }

    /**
    The override governing `name`: the exact entry if present, otherwise the nearest ancestor's.

    Longest prefix wins, so a leaf can be configured without disturbing its siblings or the
    coarser setting on their common ancestor.  Does not allocate.
    */
    pub fn resolve(&self, name: &str) -> Option<Severity> {
        if self.entries.is_empty() {
            return None;
        }
        if let Some(level) = self.entries.get(name) {
            return Some(*level);
        }
        ancestors(name).find_map(|ancestor| self.entries.get(ancestor).copied())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Severity)> {
        self.entries.iter().map(|(name, level)| (&**name, *level))
    }
}

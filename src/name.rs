// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical logger names.
//!
//! A name is a dot-delimited string such as `"planner.costmap.inflation"`.  Its ancestors are
//! its proper dot-delimited prefixes, here `"planner.costmap"` and `"planner"`.
//!
//! Everything on the hot path works on `&str` slices of the unmodified name, so resolving a
//! level never allocates.

use crate::error::ConfigError;
use std::fmt::Display;
use std::sync::Arc;

pub const SEPARATOR: char = '.';

/**
An immutable, validated logger name.

Cloning is a reference count increment.
*/
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoggerName(Arc<str>);

impl LoggerName {
    /// Validates `name`.  Names must be non-empty and may not contain empty segments
    /// (`"a..b"`, `".a"`, `"a."`).
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        validate(name)?;
        Ok(Self(Arc::from(name)))
    }

    /// `self + "." + child`.  `child` may itself be dotted.
    pub fn child(&self, child: &str) -> Result<Self, ConfigError> {
        validate(child)?;
        let mut full = String::with_capacity(self.0.len() + 1 + child.len());
        full.push_str(&self.0);
        full.push(SEPARATOR);
        full.push_str(child);
        Ok(Self(Arc::from(full)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nearest ancestor, if any.
    pub fn parent(&self) -> Option<&str> {
        ancestors(&self.0).next()
    }

    /// Ancestors nearest first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        ancestors(&self.0)
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count() + 1
    }
}

fn validate(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.split(SEPARATOR).any(str::is_empty) {
        "name contains an empty segment"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

impl AsRef<str> for LoggerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for LoggerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoggerName({:?})", &*self.0)
    }
}

impl Display for LoggerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LoggerName {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/**
Iterator over the ancestors of a name, nearest first.

Each item is a prefix slice of the original string; nothing is allocated.
*/
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    remaining: &'a str,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let cut = self.remaining.rfind(SEPARATOR)?;
        self.remaining = &self.remaining[..cut];
        Some(self.remaining)
    }
}

/// Ancestors of an unvalidated name, nearest first.
pub fn ancestors(name: &str) -> Ancestors<'_> {
    Ancestors { remaining: name }
}

/// Whether `ancestor` is a proper dot-delimited prefix of `name`.
pub fn is_ancestor(ancestor: &str, name: &str) -> bool {
    name.len() > ancestor.len()
        && name.starts_with(ancestor)
        && name.as_bytes()[ancestor.len()] == SEPARATOR as u8
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Severity levels.

use crate::error::ConfigError;
use std::fmt::Display;
use std::str::FromStr;

/**
The severity of a log call, or the threshold that governs it.

Levels are totally ordered `Debug < Info < Warn < Error < Fatal`.  [Severity::Unset] sorts
below everything and is administrative only: it means "no override here" when passed to
[crate::LoggingContext::set_level], and a call made at `Unset` is never emitted.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// No override; removes an entry from the severity table.
    #[default]
    Unset = 0,
    /// Detailed diagnostics for developers of the node.
    Debug = 10,
    /// Normal operational messages.
    Info = 20,
    /// Suspicious condition that the node recovered from.
    Warn = 30,
    /// Runtime error.
    Error = 40,
    /// The node cannot continue.
    Fatal = 50,
}

/// The level used when nothing else is configured.
pub const DEFAULT_SEVERITY: Severity = Severity::Info;

const COLOR_RED: &str = "\x1b[31m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_YELLOW: &str = "\x1b[33m";
const COLOR_NORMAL: &str = "\x1b[0m";

impl Severity {
    /// Every level a call can be made at, lowest first.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Unset => "UNSET",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [Self::as_u8].  Returns `None` for values that are not a level.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Severity::Unset),
            10 => Some(Severity::Debug),
            20 => Some(Severity::Info),
            30 => Some(Severity::Warn),
            40 => Some(Severity::Error),
            50 => Some(Severity::Fatal),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_unset(self) -> bool {
        matches!(self, Severity::Unset)
    }

    /// ANSI escape that starts a line of this severity.
    pub const fn color_code(self) -> &'static str {
        match self {
            Severity::Debug => COLOR_GREEN,
            Severity::Warn => COLOR_YELLOW,
            Severity::Error | Severity::Fatal => COLOR_RED,
            Severity::Info | Severity::Unset => COLOR_NORMAL,
        }
    }

    pub const fn reset_color_code() -> &'static str {
        COLOR_NORMAL
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    /// Case-insensitive; `warning` is accepted as a spelling of `warn`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let level = if s.eq_ignore_ascii_case("debug") {
            Severity::Debug
        } else if s.eq_ignore_ascii_case("info") {
            Severity::Info
        } else if s.eq_ignore_ascii_case("warn") || s.eq_ignore_ascii_case("warning") {
            Severity::Warn
        } else if s.eq_ignore_ascii_case("error") {
            Severity::Error
        } else if s.eq_ignore_ascii_case("fatal") {
            Severity::Fatal
        } else if s.eq_ignore_ascii_case("unset") {
            Severity::Unset
        } else {
            return Err(ConfigError::InvalidSeverity(s.to_string()));
        };
        Ok(level)
    }
}

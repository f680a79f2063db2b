// SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Backend
//!
//! An [ExternalBackend] that keeps rendered lines in memory instead of writing them anywhere,
//! which makes it the tool of choice for:
//!
//! - Unit testing code that logs through nodelog
//! - Programmatically examining log output
//! - Capturing logs where stderr is redirected or unavailable
//!
//! Unlike the other sinks, it copies each line into a `String`, so accepted records allocate.

use crate::error::SinkError;
use crate::external_sink::ExternalBackend;
use crate::log_record::LogRecord;
use crate::severity::Severity;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    lines: Vec<String>,
    level: Option<Severity>,
    log_dir: Option<PathBuf>,
    initialized: usize,
    shut_down: usize,
}

/// An in-memory backend that stores rendered log lines in a `Vec<String>`.
///
/// # Example
///
/// ```rust
/// use nodelog::{Config, InMemoryBackend, LoggingContext, Logger};
/// use std::sync::Arc;
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let context = Arc::new(LoggingContext::new());
/// context
///     .init(Config {
///         console_enabled: false,
///         external_backend: Some(backend.clone()),
///         log_directory: Some(std::env::temp_dir()),
///         ..Config::default()
///     })
///     .unwrap();
///
/// let logger = Logger::with_context(context.clone(), "doc.example").unwrap();
/// nodelog::log_info!(logger, "Test message {}", 42);
///
/// let logs = backend.drain_logs();
/// assert!(logs.contains("Test message 42"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// - Debug: Derived for diagnostic purposes and required by ExternalBackend
// - Default: Implemented with obvious zero-value (empty buffer)
// - Clone: NOT implemented - two handles on one buffer is what Arc is for
// - PartialEq/Eq/Hash: NOT implemented - equality semantics unclear for backends
// - Send/Sync: Automatically implemented due to Mutex usage (required for ExternalBackend)

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drains all lines into a single string joined by newlines, clearing the buffer.
    pub fn drain_logs(&self) -> String {
        let mut state = self.state();
        let result = state.lines.join("\n");
        state.lines.clear();
        result
    }

    /// Drains all lines, one entry per record.
    pub fn drain_lines(&self) -> Vec<String> {
        std::mem::take(&mut self.state().lines)
    }

    /// Writes all lines to stderr, clearing the buffer.
    pub fn drain_to_console(&self) {
        let lines = self.drain_lines();
        for line in lines {
            eprintln!("{}", line);
        }
    }

    /// The level last passed to [ExternalBackend::set_level].
    pub fn level(&self) -> Option<Severity> {
        self.state().level
    }

    /// The directory passed to the last [ExternalBackend::initialize].
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.state().log_dir.clone()
    }

    /// How many times the backend was initialized and shut down.
    pub fn lifecycle_counts(&self) -> (usize, usize) {
        let state = self.state();
        (state.initialized, state.shut_down)
    }
}

impl ExternalBackend for InMemoryBackend {
    fn initialize(&self, log_dir: &Path) -> Result<(), SinkError> {
        let mut state = self.state();
        state.log_dir = Some(log_dir.to_path_buf());
        state.initialized += 1;
        Ok(())
    }

    fn set_level(&self, level: Severity) -> Result<(), SinkError> {
        self.state().level = Some(level);
        Ok(())
    }

    fn log(&self, _record: &LogRecord<'_>, line: &str) -> Result<(), SinkError> {
        self.state().lines.push(line.to_string());
        Ok(())
    }

    /// No-op apart from bookkeeping; there is nothing to flush.
    fn shutdown(&self) -> Result<(), SinkError> {
        self.state().shut_down += 1;
        Ok(())
    }
}

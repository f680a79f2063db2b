// SPDX-License-Identifier: MIT OR Apache-2.0

//! The record handed to sinks.
//!
//! A [LogRecord] exists only for the duration of one accepted log call.  It borrows everything:
//! the logger name from the handle, the source location from a `static` [CallSite], and the
//! message from a stack [LogBuffer](crate::LogBuffer).  Sinks that need to keep anything must
//! copy it out before `consume` returns.

use crate::severity::Severity;
use crate::sys::{SystemTime, nanos_since_epoch};
use std::panic::Location;

/**
Source location of a log call.

Captured once per call site: the logging macros place one in a `static`, so nothing is
computed per invocation.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    function: &'static str,
    file: &'static str,
    line: u32,
}

impl CallSite {
    pub const fn new(function: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            function,
            file,
            line,
        }
    }

    /// The location of the caller.  The function name is not available this way and is left
    /// empty.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            function: "",
            file: location.file(),
            line: location.line(),
        }
    }

    pub const fn function(&self) -> &'static str {
        self.function
    }

    pub const fn file(&self) -> &'static str {
        self.file
    }

    pub const fn line(&self) -> u32 {
        self.line
    }
}

/**
An accepted log call, ready for the sinks.
*/
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    severity: Severity,
    name: &'a str,
    location: &'a CallSite,
    timestamp: SystemTime,
    message: &'a str,
}

impl<'a> LogRecord<'a> {
    pub fn new(
        severity: Severity,
        name: &'a str,
        location: &'a CallSite,
        timestamp: SystemTime,
        message: &'a str,
    ) -> Self {
        Self {
            severity,
            name,
            location,
            timestamp,
            message,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn location(&self) -> &'a CallSite {
        self.location
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn nanos_since_epoch(&self) -> u128 {
        nanos_since_epoch(self.timestamp)
    }

    pub fn message(&self) -> &'a str {
        self.message
    }
}

/*
Boilerplate notes for LogRecord:

IMPLEMENTED:
- Debug, Clone, Copy: every field is a borrow or a small value.

NOT IMPLEMENTED:
- PartialEq/Eq/Hash: two calls with the same text are still different events.
- Default: a record without a call site is meaningless.
- Display: how a record looks is the job of the active FormatProgram.
*/

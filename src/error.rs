// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy.
//!
//! Errors local to one sink or one log call never escalate into shared state.  Only a failed
//! [crate::LoggingContext::init] changes the lifecycle, and then only back to
//! [LifecycleState::Uninitialized](crate::LifecycleState::Uninitialized).

use crate::context::LifecycleState;
use crate::logger::Logger;
use thiserror::Error;

/// A configuration value could not be used.  Always recoverable: the default is used instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid severity `{0}`")]
    InvalidSeverity(String),
    #[error("invalid logger name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("invalid level override `{0}`, expected `name:=level` or `level`")]
    InvalidOverride(String),
    #[error("invalid value `{value}` for {option}")]
    InvalidFlag { option: &'static str, value: String },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no home directory to place logs in")]
    NoHomeDirectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("output format is empty")]
    Empty,
    #[error("output format is {len} bytes, at most {max} are supported")]
    TooLong { len: usize, max: usize },
}

/// Slow-path buffer growth was refused by the injected allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("could not grow log buffer to {requested} bytes")]
pub struct AllocationFailure {
    pub requested: usize,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("console write failed: {0}")]
    Console(#[from] std::io::Error),
    #[error(transparent)]
    Allocation(#[from] AllocationFailure),
    #[error("publisher for `{logger}` rejected the message: {reason}")]
    Publish { logger: String, reason: String },
    #[error("external backend failed: {0}")]
    External(String),
}

/// The sinks that failed during one dispatch.  The remaining sinks still ran.
#[derive(Debug, Error)]
#[error("{} sink(s) failed, first: {}", .failures.len(), first_failure(.failures))]
pub struct DispatchError {
    pub failures: Vec<SinkError>,
}

fn first_failure(failures: &[SinkError]) -> String {
    failures
        .first()
        .map(|f| f.to_string())
        .unwrap_or_default()
}

/// An administrative call was made in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} while logging is {state:?}")]
pub struct LifecycleError {
    pub operation: &'static str,
    pub state: LifecycleState,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Allocation(#[from] AllocationFailure),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// A sink failed outside of a dispatch, e.g. while being removed.
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("no publisher registered for ancestor `{ancestor}`")]
    NoPublisherForAncestor { ancestor: String },
    #[error("a publisher is already registered for `{name}`")]
    PublisherAlreadyRegistered { name: String },
    #[error("initialization failed: {source}")]
    Init {
        #[source]
        source: SinkError,
    },
}

/**
Returned by [Logger::derive].

Deriving never aborts.  When the parent has no publisher, the child is still created as an
ordinary (non-publishing) logger and handed back inside the error.  Callers that only care
about console and external output can recover it with [DeriveError::logger].  The same holds
when the parent is publishing but its context no longer accepts registrations.
*/
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error(transparent)]
    InvalidName(#[from] ConfigError),
    #[error("no publisher registered for ancestor `{ancestor}`")]
    NoPublisherForAncestor { ancestor: String, logger: Logger },
    #[error("cannot share the publisher of `{ancestor}`: {source}")]
    Lifecycle {
        ancestor: String,
        #[source]
        source: LifecycleError,
        logger: Logger,
    },
}

impl DeriveError {
    /// The usable child logger, if one was created.
    pub fn logger(self) -> Option<Logger> {
        match self {
            DeriveError::InvalidName(_) => None,
            DeriveError::NoPublisherForAncestor { logger, .. }
            | DeriveError::Lifecycle { logger, .. } => Some(logger),
        }
    }
}

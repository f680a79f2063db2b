// SPDX-License-Identifier: MIT OR Apache-2.0

//! The publish (broadcast) sink.
//!
//! Records from publishing loggers are handed to the logger's [Publisher] as a [LogMessage].
//! Records from every other logger are skipped silently.

use crate::error::SinkError;
use crate::log_record::LogRecord;
use crate::severity::Severity;
use crate::sink::SinkEnv;
use crate::sys::SystemTime;
use std::cell::Cell;
use std::fmt::Debug;

pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/**
The message handed to a [Publisher].

Every field borrows from the record being dispatched; the message ends when
[Publisher::publish] returns, so a publisher that needs to keep anything must serialize or copy
it before returning.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMessage<'a> {
    pub stamp: SystemTime,
    pub level: Severity,
    pub name: &'a str,
    pub msg: &'a str,
    pub file: &'a str,
    pub function: &'a str,
    pub line: u32,
}

impl<'a> LogMessage<'a> {
    pub fn from_record(record: &LogRecord<'a>) -> Self {
        let location = record.location();
        Self {
            stamp: record.timestamp(),
            level: record.severity(),
            name: record.name(),
            msg: record.message(),
            file: location.file(),
            function: location.function(),
            line: location.line(),
        }
    }
}

/**
The transport capability behind a publishing logger.

Implemented by the transport layer; this crate only calls it.
*/
pub trait Publisher: Debug + Send + Sync {
    fn publish(&self, message: &LogMessage<'_>) -> Result<(), PublishError>;

    /// The registration this publisher was created for has ended.
    fn close(&self) {}
}

thread_local! {
    static PUBLISHING: Cell<bool> = const { Cell::new(false) };
}

struct PublishingGuard;

impl PublishingGuard {
    fn enter() -> Self {
        PUBLISHING.with(|p| p.set(true));
        PublishingGuard
    }
}

impl Drop for PublishingGuard {
    fn drop(&mut self) {
        PUBLISHING.with(|p| p.set(false));
    }
}

/// Routes records of publishing loggers to their [Publisher].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PublishSink;

impl PublishSink {
    pub const fn new() -> Self {
        Self
    }

    pub fn consume(&self, record: &LogRecord<'_>, env: &SinkEnv<'_>) -> Result<(), SinkError> {
        // a publisher that logs on this thread must not feed itself
        if PUBLISHING.with(Cell::get) {
            return Ok(());
        }
        let Some(publisher) = env.publishers.lookup(record.name()) else {
            return Ok(());
        };
        let message = LogMessage::from_record(record);
        let _publishing = PublishingGuard::enter();
        publisher.publish(&message).map_err(|err| SinkError::Publish {
            logger: record.name().to_string(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SystemAllocator;
    use crate::format::FormatProgram;
    use crate::log_record::CallSite;
    use crate::publisher_registry::PublisherRegistry;
    use crate::sys::UNIX_EPOCH;
    use std::sync::{Arc, Mutex};

    static SITE: CallSite = CallSite::new("pub_fn", "pub.rs", 9);

    #[derive(Debug, Default)]
    struct Recording {
        seen: Mutex<Vec<(String, String, Severity, u32)>>,
    }

    impl Publisher for Recording {
        fn publish(&self, message: &LogMessage<'_>) -> Result<(), PublishError> {
            self.seen.lock().unwrap().push((
                message.name.to_string(),
                message.msg.to_string(),
                message.level,
                message.line,
            ));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Publisher for Failing {
        fn publish(&self, _message: &LogMessage<'_>) -> Result<(), PublishError> {
            Err("transport down".into())
        }
    }

    fn consume(registry: &PublisherRegistry, name: &str) -> Result<(), SinkError> {
        let format = FormatProgram::default();
        let env = SinkEnv {
            format: &format,
            allocator: &SystemAllocator,
            publishers: registry,
        };
        let record = LogRecord::new(Severity::Warn, name, &SITE, UNIX_EPOCH, "payload");
        PublishSink::new().consume(&record, &env)
    }

    #[test]
    fn unregistered_logger_is_skipped() {
        let registry = PublisherRegistry::new();
        consume(&registry, "quiet").unwrap();
    }

    #[test]
    fn registered_logger_is_published() {
        let registry = PublisherRegistry::new();
        let publisher = Arc::new(Recording::default());
        registry.register("talker", publisher.clone()).unwrap();
        consume(&registry, "talker").unwrap();
        consume(&registry, "talker.other").unwrap();
        let seen = publisher.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(
                "talker".to_string(),
                "payload".to_string(),
                Severity::Warn,
                9
            )]
        );
    }

    #[test]
    fn publisher_failure_becomes_sink_error() {
        let registry = PublisherRegistry::new();
        registry.register("flaky", Arc::new(Failing)).unwrap();
        match consume(&registry, "flaky") {
            Err(SinkError::Publish { logger, reason }) => {
                assert_eq!(logger, "flaky");
                assert_eq!(reason, "transport down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

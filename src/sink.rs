// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of output sinks.

use crate::buffer::BufferAllocator;
use crate::console_sink::ConsoleSink;
use crate::error::SinkError;
use crate::external_sink::ExternalSink;
use crate::format::FormatProgram;
use crate::log_record::LogRecord;
use crate::publish_sink::PublishSink;
use crate::publisher_registry::PublisherRegistry;

/**
What a sink may use while consuming a record, besides the record itself.

Borrowed from the [crate::LoggingContext] for the duration of one dispatch.
*/
#[derive(Debug, Clone, Copy)]
pub struct SinkEnv<'a> {
    pub format: &'a FormatProgram,
    pub allocator: &'a dyn BufferAllocator,
    pub publishers: &'a PublisherRegistry,
}

/**
An independent consumer of accepted records.

The set is closed: console, publish, external.  Open-ended output goes through
[ExternalSink] and its [crate::ExternalBackend] capability.
*/
#[derive(Debug, Clone)]
pub enum Sink {
    Console(ConsoleSink),
    Publish(PublishSink),
    External(ExternalSink),
}

impl Sink {
    pub fn consume(&self, record: &LogRecord<'_>, env: &SinkEnv<'_>) -> Result<(), SinkError> {
        match self {
            Sink::Console(sink) => sink.consume(record, env),
            Sink::Publish(sink) => sink.consume(record, env),
            Sink::External(sink) => sink.consume(record, env),
        }
    }

    /**
    The application may imminently exit, or the sink is being removed.  Ensure all buffers are
    flushed and release what the sink holds.
    */
    pub fn prepare_to_die(&self) -> Result<(), SinkError> {
        match self {
            Sink::Console(sink) => sink.prepare_to_die(),
            Sink::Publish(_) => Ok(()),
            Sink::External(sink) => sink.prepare_to_die(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Sink::Console(_) => "console",
            Sink::Publish(_) => "publish",
            Sink::External(_) => "external",
        }
    }
}

impl From<ConsoleSink> for Sink {
    fn from(sink: ConsoleSink) -> Self {
        Sink::Console(sink)
    }
}

impl From<PublishSink> for Sink {
    fn from(sink: PublishSink) -> Self {
        Sink::Publish(sink)
    }
}

impl From<ExternalSink> for Sink {
    fn from(sink: ExternalSink) -> Self {
        Sink::External(sink)
    }
}

/// Identifies a registered sink for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(pub(crate) u64);

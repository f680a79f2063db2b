// SPDX-License-Identifier: MIT OR Apache-2.0

//! The external sink, which hands records to a third-party backend.

use crate::buffer::LogBuffer;
use crate::error::SinkError;
use crate::log_record::LogRecord;
use crate::severity::Severity;
use crate::sink::SinkEnv;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/**
Capability implemented by an external logging backend.

The backend owns its own buffering and flush policy; the sink calls it synchronously and does
not wait for anything it defers.
*/
pub trait ExternalBackend: Debug + Send + Sync {
    /**
    Prepares the backend to receive records.  Called once per initialization of the
    [crate::LoggingContext] with the resolved log directory, which the backend may create.
    */
    fn initialize(&self, log_dir: &Path) -> Result<(), SinkError>;

    /// The global default level changed.
    fn set_level(&self, level: Severity) -> Result<(), SinkError>;

    /// `line` is `record` rendered with the active format program, without a trailing newline.
    fn log(&self, record: &LogRecord<'_>, line: &str) -> Result<(), SinkError>;

    /// Flush and release everything.  No records arrive after this.
    fn shutdown(&self) -> Result<(), SinkError>;
}

/// Adapts an [ExternalBackend] to the sink chain.
#[derive(Debug, Clone)]
pub struct ExternalSink {
    backend: Arc<dyn ExternalBackend>,
}

impl ExternalSink {
    pub fn new(backend: Arc<dyn ExternalBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ExternalBackend> {
        &self.backend
    }

    pub fn consume(&self, record: &LogRecord<'_>, env: &SinkEnv<'_>) -> Result<(), SinkError> {
        let mut line = LogBuffer::new(env.allocator);
        if env.format.render(record, &mut line).is_err() {
            line.finish()?;
        }
        self.backend.log(record, line.as_str())
    }

    pub fn prepare_to_die(&self) -> Result<(), SinkError> {
        self.backend.shutdown()
    }
}

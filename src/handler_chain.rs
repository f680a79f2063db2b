// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ordered chain of output sinks.
//!
//! The chain is stored as an immutable `Arc<[(SinkId, Sink)]>` behind a [RwSpinlock].  A
//! dispatch clones the `Arc` under a brief read lock and runs the sinks with the lock released,
//! so a slow sink never holds up administration and a sink that logs never deadlocks.
//!
//! Registration and removal replace the whole slice (copy-on-write).  Dispatches already in
//! flight finish against the chain they started with.

use crate::error::{DispatchError, SinkError};
use crate::log_record::LogRecord;
use crate::sink::{Sink, SinkEnv, SinkId};
use crate::spinlock::RwSpinlock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct OutputHandlerChain {
    sinks: RwSpinlock<Arc<[(SinkId, Sink)]>>,
    next_id: AtomicU64,
}

impl OutputHandlerChain {
    pub fn new() -> Self {
        Self {
            sinks: RwSpinlock::new(Arc::from(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `sink`; it runs after every sink registered before it.
    pub fn register(&self, sink: Sink) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.write(|sinks| {
            let mut next = Vec::with_capacity(sinks.len() + 1);
            next.extend(sinks.iter().cloned());
            next.push((id, sink));
            *sinks = Arc::from(next);
        });
        id
    }

    /// Removes and returns the sink registered as `id`.  The caller decides whether to
    /// `prepare_to_die` it.
    pub fn remove(&self, id: SinkId) -> Option<Sink> {
        self.sinks.write(|sinks| {
            let position = sinks.iter().position(|(i, _)| *i == id)?;
            let removed = sinks[position].1.clone();
            let next: Vec<(SinkId, Sink)> = sinks
                .iter()
                .filter(|(i, _)| *i != id)
                .cloned()
                .collect();
            *sinks = Arc::from(next);
            Some(removed)
        })
    }

    /// Removes every sink, returning them in registration order.
    pub fn clear(&self) -> Vec<Sink> {
        let previous = self
            .sinks
            .write(|sinks| std::mem::replace(sinks, Arc::from(Vec::new())));
        previous.iter().map(|(_, sink)| sink.clone()).collect()
    }

    /// The current chain.  Cloning the `Arc` does not allocate.
    pub fn snapshot(&self) -> Arc<[(SinkId, Sink)]> {
        self.sinks.read(|sinks| sinks.clone())
    }

    pub fn len(&self) -> usize {
        self.sinks.read(|sinks| sinks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
    Runs every sink on `record`, in registration order, on the calling thread.

    A failing sink does not stop the ones after it; all failures are returned together.
    */
    pub fn dispatch(&self, record: &LogRecord<'_>, env: &SinkEnv<'_>) -> Result<(), DispatchError> {
        let sinks = self.snapshot();
        dispatch_to(&sinks, record, env)
    }
}

impl Default for OutputHandlerChain {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn dispatch_to(
    sinks: &[(SinkId, Sink)],
    record: &LogRecord<'_>,
    env: &SinkEnv<'_>,
) -> Result<(), DispatchError> {
    let mut failures: Vec<SinkError> = Vec::new();
    for (_, sink) in sinks {
        if let Err(e) = sink.consume(record, env) {
            failures.push(e);
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DispatchError { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SystemAllocator;
    use crate::error::SinkError;
    use crate::external_sink::{ExternalBackend, ExternalSink};
    use crate::format::FormatProgram;
    use crate::log_record::CallSite;
    use crate::publisher_registry::PublisherRegistry;
    use crate::severity::Severity;
    use crate::sys::UNIX_EPOCH;
    use std::path::Path;
    use std::sync::Mutex;

    static SITE: CallSite = CallSite::new("chain", "chain.rs", 7);

    #[derive(Debug)]
    struct Tagged {
        tag: &'static str,
        fail: bool,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ExternalBackend for Tagged {
        fn initialize(&self, _log_dir: &Path) -> Result<(), SinkError> {
            Ok(())
        }
        fn set_level(&self, _level: Severity) -> Result<(), SinkError> {
            Ok(())
        }
        fn log(&self, _record: &LogRecord<'_>, _line: &str) -> Result<(), SinkError> {
            self.order.lock().unwrap().push(self.tag);
            if self.fail {
                Err(SinkError::External(self.tag.to_string()))
            } else {
                Ok(())
            }
        }
        fn shutdown(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn tagged(tag: &'static str, fail: bool, order: &Arc<Mutex<Vec<&'static str>>>) -> Sink {
        ExternalSink::new(Arc::new(Tagged {
            tag,
            fail,
            order: order.clone(),
        }))
        .into()
    }

    fn run(chain: &OutputHandlerChain) -> Result<(), DispatchError> {
        let format = FormatProgram::default();
        let registry = PublisherRegistry::new();
        let env = SinkEnv {
            format: &format,
            allocator: &SystemAllocator,
            publishers: &registry,
        };
        let record = LogRecord::new(Severity::Info, "chain", &SITE, UNIX_EPOCH, "m");
        chain.dispatch(&record, &env)
    }

    #[test]
    fn runs_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = OutputHandlerChain::new();
        chain.register(tagged("a", false, &order));
        chain.register(tagged("b", false, &order));
        chain.register(tagged("c", false, &order));
        run(&chain).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failure_does_not_silence_later_sinks() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = OutputHandlerChain::new();
        chain.register(tagged("a", true, &order));
        chain.register(tagged("b", false, &order));
        chain.register(tagged("c", true, &order));
        let err = run(&chain).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_by_id() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = OutputHandlerChain::new();
        chain.register(tagged("a", false, &order));
        let b = chain.register(tagged("b", false, &order));
        assert!(chain.remove(b).is_some());
        assert!(chain.remove(b).is_none());
        assert_eq!(chain.len(), 1);
        run(&chain).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn snapshot_survives_clear() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = OutputHandlerChain::new();
        chain.register(tagged("a", false, &order));
        let snapshot = chain.snapshot();
        assert_eq!(chain.clear().len(), 1);
        assert!(chain.is_empty());
        assert_eq!(snapshot.len(), 1);
    }
}

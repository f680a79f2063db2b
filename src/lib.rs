//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# nodelog

nodelog is the logging core of a robotics middleware node: hierarchical named loggers,
per-name severity thresholds, a compiled output format and a chain of output sinks.

# The problem

A node logs from two very different places.  Configuration wants to be human-friendly:
dotted logger names, levels inherited from ancestors, overrides changed at runtime.  Control
loops want a log call that costs nothing when it is filtered out: no allocation, no blocking,
deterministic cost.  nodelog is built around keeping both.

# Names and levels

Loggers are named with dotted paths.  `"arm.joint.elbow"` has the ancestors `"arm.joint"`
and `"arm"`.  A level set on a name applies to it and to every descendant without a level of
its own; the nearest override wins, and with no override at all the default level (`INFO`)
applies.

```rust
use nodelog::{LoggingContext, Severity};

let context = LoggingContext::new();
context.set_level("arm", Severity::Warn).unwrap();
context.set_level("arm.joint", Severity::Debug).unwrap();

assert_eq!(context.effective_level("arm.gripper"), Severity::Warn);
assert_eq!(context.effective_level("arm.joint.elbow"), Severity::Debug);
assert_eq!(context.effective_level("leg"), Severity::Info);
```

| Severity | Usecase                                   |
|----------|-------------------------------------------|
| DEBUG    | diagnostics for developers of the node    |
| INFO     | normal operation                          |
| WARN     | suspicious condition that was recovered   |
| ERROR    | runtime error                             |
| FATAL    | the node cannot continue                  |

# Output

Accepted records are rendered with a format template compiled once, e.g. the default
`"[{severity}] [{time}] [{name}]: {message}"`, and handed to every sink in order:

* the console sink writes one line to stderr or stdout, optionally colored;
* the publish sink broadcasts records of publishing loggers through their [Publisher];
* the external sink forwards the rendered line to an [ExternalBackend], such as
  [FileBackend] or [InMemoryBackend].

A failing sink never silences the others.

# The API

```rust
use nodelog::{log_info, log_warn, Logger};

nodelog::init_from_env().unwrap();
let logger = Logger::new("planner").unwrap();
log_info!(logger, "planning with {} waypoints", 12);
log_warn!(name: "planner.astar", "no path found");
nodelog::shutdown().unwrap();
```

Each call site captures its location once, in a `static`.  Format arguments are only
evaluated when the record is emitted.

# Configuration

[Config::from_env] reads `NODELOG_`-prefixed environment variables; see [config].  Values that
cannot be used fall back to defaults and are reported as warnings, never as failures:
[init_from_env] logs them under `nodelog` and keeps them in [LoggingContext::warnings].

# Multithreading

Log calls run synchronously on the calling thread.  Readers of the severity table never block
each other.  Administrative calls share one re-entrant lock, so a sink or backend that calls
back into the context while it is being configured does not deadlock.
*/

mod buffer;
pub mod config;
mod console_sink;
pub mod context;
mod error;
mod external_sink;
#[cfg(not(target_arch = "wasm32"))]
mod file_backend;
pub mod format;
mod handler_chain;
mod inmemory_backend;
mod log_record;
mod logger;
mod macros;
pub mod name;
mod publish_sink;
mod publisher_registry;
mod reentrant;
mod severity;
mod severity_table;
mod sink;
mod spinlock;
mod sys;

pub use buffer::{BufferAllocator, INLINE_CAPACITY, LogBuffer, NoGrowthAllocator, SystemAllocator};
pub use config::{Buffering, ColorMode, Config, DefaultLogDir, LogDirResolver};
pub use console_sink::{ConsoleSink, ConsoleStream};
pub use context::{LifecycleState, LoggingContext};
pub use error::{
    AllocationFailure, ConfigError, DeriveError, DispatchError, FormatError, LifecycleError,
    LoggingError, SinkError,
};
pub use external_sink::{ExternalBackend, ExternalSink};
#[cfg(not(target_arch = "wasm32"))]
pub use file_backend::{FLUSH_INTERVAL, FileBackend};
pub use format::{Field, FormatProgram};
pub use handler_chain::OutputHandlerChain;
pub use inmemory_backend::InMemoryBackend;
pub use log_record::{CallSite, LogRecord};
pub use logger::{Logger, LoggerKind};
pub use name::LoggerName;
pub use publish_sink::{LogMessage, PublishError, PublishSink, Publisher};
pub use publisher_registry::PublisherRegistry;
pub use severity::{DEFAULT_SEVERITY, Severity};
pub use severity_table::SeverityTable;
pub use sink::{Sink, SinkEnv, SinkId};
pub use sys::{Duration, Instant, SystemTime};

use std::fmt;
use std::sync::Arc;

/// The process-wide [LoggingContext].
pub fn context() -> &'static Arc<LoggingContext> {
    LoggingContext::global()
}

/// Initializes the process-wide context.  See [LoggingContext::init].
pub fn init(config: Config) -> Result<(), LoggingError> {
    context().init(config)
}

/// Initializes the process-wide context from the `NODELOG_` environment variables.
pub fn init_from_env() -> Result<(), LoggingError> {
    init(Config::from_env())
}

/// Shuts the process-wide context down.  See [LoggingContext::shutdown].
pub fn shutdown() -> Result<(), LoggingError> {
    context().shutdown()
}

/**
Logs through the process-wide context.

This is the entry point for callers that do not use the macros, such as a service dispatcher
that already has a location at hand.
*/
pub fn log(
    name: &str,
    severity: Severity,
    location: &CallSite,
    args: fmt::Arguments<'_>,
) -> Result<(), LoggingError> {
    context().log(name, severity, location, args)
}

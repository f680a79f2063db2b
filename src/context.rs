// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
The logging context: severity table, active format, sink chain and publisher registry, with an
explicit lifecycle.

```text
Uninitialized --init--> Initializing --ok--> Ready --shutdown--> ShuttingDown --> Shutdown
                             |
                             +--error--> Uninitialized
```

One process-wide context is reachable through [crate::context()].  Independent contexts can be
built with [LoggingContext::new], which is how the tests avoid sharing state.

# Fast path

[LoggingContext::is_enabled_for] is the whole cost of a filtered-out call: one atomic load
when there are no overrides, otherwise one read-locked lookup of the name and its ancestors.
Readers never block each other, nothing allocates and the administrative lock is never taken.

# Administration

Every mutating call takes one re-entrant administrative lock, so a sink or backend that calls
back into the context while it is being configured proceeds instead of deadlocking.  Once the
context is shutting down, administrative calls fail with [LifecycleError].
*/

use crate::buffer::{BufferAllocator, LogBuffer, SystemAllocator};
use crate::config::{Config, DefaultLogDir, LogDirResolver};
use crate::console_sink::ConsoleSink;
use crate::error::{
    ConfigError, DispatchError, FormatError, LifecycleError, LoggingError, SinkError,
};
use crate::external_sink::{ExternalBackend, ExternalSink};
use crate::format::FormatProgram;
use crate::handler_chain::OutputHandlerChain;
use crate::log_record::{CallSite, LogRecord};
use crate::name::LoggerName;
use crate::publish_sink::{PublishSink, Publisher};
use crate::publisher_registry::PublisherRegistry;
use crate::reentrant::{AdminGuard, ReentrantLock};
use crate::severity::{DEFAULT_SEVERITY, Severity};
use crate::severity_table::SeverityTable;
use crate::sink::{Sink, SinkEnv, SinkId};
use crate::spinlock::RwSpinlock;
use crate::sys::SystemTime;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// The logger name the context reports its own warnings under.
pub const INTERNAL_LOGGER: &str = "nodelog";

static INIT_SITE: CallSite = CallSite::new("nodelog::LoggingContext::init", file!(), line!());

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    ShuttingDown = 3,
    /// Terminal.
    Shutdown = 4,
}

impl LifecycleState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Initializing,
            2 => LifecycleState::Ready,
            3 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Shutdown,
        }
    }
}

/// Everything [LoggingContext::init] builds before committing any of it.
struct Staged {
    format: Arc<FormatProgram>,
    default_level: Severity,
    overrides: Vec<(String, Severity)>,
    sinks: Vec<Sink>,
    external: Option<Arc<dyn ExternalBackend>>,
    warnings: Vec<ConfigError>,
}

pub struct LoggingContext {
    state: AtomicU8,
    admin: ReentrantLock,
    default_level: AtomicU8,
    /// Mirrors the table size so the fast path can skip the table entirely.
    override_count: AtomicUsize,
    table: RwSpinlock<SeverityTable>,
    format: RwSpinlock<Arc<FormatProgram>>,
    chain: OutputHandlerChain,
    publishers: PublisherRegistry,
    allocator: RwSpinlock<Arc<dyn BufferAllocator>>,
    external: RwSpinlock<Option<Arc<dyn ExternalBackend>>>,
    fallback: ConsoleSink,
    warnings: Mutex<Vec<ConfigError>>,
}

static GLOBAL: OnceLock<Arc<LoggingContext>> = OnceLock::new();

impl LoggingContext {
    /// An uninitialized context with the default level, the default format and no sinks.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            admin: ReentrantLock::new(),
            default_level: AtomicU8::new(DEFAULT_SEVERITY.as_u8()),
            override_count: AtomicUsize::new(0),
            table: RwSpinlock::new(SeverityTable::new()),
            format: RwSpinlock::new(Arc::new(FormatProgram::default())),
            chain: OutputHandlerChain::new(),
            publishers: PublisherRegistry::new(),
            allocator: RwSpinlock::new(Arc::new(SystemAllocator)),
            external: RwSpinlock::new(None),
            fallback: ConsoleSink::fallback(),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide context, created uninitialized on first use.
    pub fn global() -> &'static Arc<LoggingContext> {
        GLOBAL.get_or_init(|| Arc::new(LoggingContext::new()))
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Takes the administrative lock, refusing once shutdown has begun.
    fn admin(&self, operation: &'static str) -> Result<AdminGuard<'_>, LifecycleError> {
        let guard = self.admin.lock();
        match self.state() {
            state @ (LifecycleState::ShuttingDown | LifecycleState::Shutdown) => {
                Err(LifecycleError { operation, state })
            }
            _ => Ok(guard),
        }
    }

    // ------------------------------------------------------------------------------------------
    // lifecycle
    // ------------------------------------------------------------------------------------------

    /**
    Initializes the context from `config`, resolving the log directory with [DefaultLogDir].

    Idempotent once `Ready`.  On failure nothing is kept and the context is `Uninitialized`
    again, so `init` may be retried.  Configuration values that could not be used do not fail
    initialization: they are logged as warnings under [INTERNAL_LOGGER] and kept for
    [LoggingContext::warnings], together with whatever [Config::warnings] already holds.
    */
    pub fn init(&self, config: Config) -> Result<(), LoggingError> {
        let resolver = DefaultLogDir::from_env(config.log_directory.clone());
        self.init_with_resolver(config, &resolver)
    }

    /// Like [LoggingContext::init], with an explicit log-directory resolver.
    pub fn init_with_resolver(
        &self,
        config: Config,
        resolver: &dyn LogDirResolver,
    ) -> Result<(), LoggingError> {
        let _admin = self.admin.lock();
        match self.state() {
            LifecycleState::Ready => return Ok(()),
            LifecycleState::Uninitialized => {}
            state => {
                return Err(LifecycleError {
                    operation: "initialize",
                    state,
                }
                .into());
            }
        }
        self.set_state(LifecycleState::Initializing);
        let staged = match self.stage(config, resolver) {
            Ok(staged) => staged,
            Err(e) => {
                self.set_state(LifecycleState::Uninitialized);
                return Err(e);
            }
        };
        let warnings = self.commit(staged);
        self.set_state(LifecycleState::Ready);
        for warning in &warnings {
            let _ = self.log(
                INTERNAL_LOGGER,
                Severity::Warn,
                &INIT_SITE,
                format_args!("{warning}"),
            );
        }
        Ok(())
    }

    fn stage(
        &self,
        mut config: Config,
        resolver: &dyn LogDirResolver,
    ) -> Result<Staged, LoggingError> {
        // values dropped while reading the environment come first
        let mut warnings = std::mem::take(&mut config.warnings);

        let format = match config.output_format.as_deref() {
            Some(template) => {
                let (program, warning) = FormatProgram::compile_or_default(template);
                warnings.extend(warning.map(ConfigError::from));
                program
            }
            None => FormatProgram::default(),
        };

        let default_level = match config.default_level {
            Some(level) if !level.is_unset() => level,
            _ => DEFAULT_SEVERITY,
        };

        let mut overrides = Vec::with_capacity(config.level_overrides.len());
        for (name, level) in std::mem::take(&mut config.level_overrides) {
            match LoggerName::new(&name) {
                Ok(_) => overrides.push((name, level)),
                Err(e) => warnings.push(e),
            }
        }

        let mut sinks = Vec::new();
        if config.console_enabled {
            sinks.push(Sink::Console(ConsoleSink::from_config(&config)));
        }
        if config.publish_enabled {
            sinks.push(Sink::Publish(PublishSink::new()));
        }
        // the backend may touch the filesystem, so it goes last
        if let Some(backend) = &config.external_backend {
            let log_dir = resolver.resolve_log_dir()?;
            backend
                .initialize(&log_dir)
                .map_err(|source| LoggingError::Init { source })?;
            if let Err(source) = backend.set_level(default_level) {
                let _ = backend.shutdown();
                return Err(LoggingError::Init { source });
            }
            sinks.push(Sink::External(ExternalSink::new(backend.clone())));
        }

        Ok(Staged {
            format: Arc::new(format),
            default_level,
            overrides,
            sinks,
            external: config.external_backend,
            warnings,
        })
    }

    fn commit(&self, staged: Staged) -> Vec<ConfigError> {
        debug_assert!(self.admin.held_by_current_thread());
        self.format.write(|format| *format = staged.format);
        self.default_level
            .store(staged.default_level.as_u8(), Ordering::Release);
        self.table.write(|table| {
            for (name, level) in &staged.overrides {
                table.set(name, *level);
            }
            self.override_count.store(table.len(), Ordering::Release);
        });
        for sink in staged.sinks {
            self.chain.register(sink);
        }
        self.external.write(|external| *external = staged.external);
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(staged.warnings.iter().cloned());
        staged.warnings
    }

    /**
    Flushes and releases every sink and publisher.

    A no-op once `Shutdown`.  Shutting down a context that was never initialized goes straight
    to `Shutdown`.  All sinks are asked to finish even if some fail; the failures are
    returned together.
    */
    pub fn shutdown(&self) -> Result<(), LoggingError> {
        let _admin = self.admin.lock();
        match self.state() {
            LifecycleState::Ready => {}
            LifecycleState::Uninitialized => {
                self.set_state(LifecycleState::Shutdown);
                return Ok(());
            }
            // re-entered from a sink that is shutting down
            LifecycleState::ShuttingDown | LifecycleState::Shutdown => return Ok(()),
            state @ LifecycleState::Initializing => {
                return Err(LifecycleError {
                    operation: "shut down",
                    state,
                }
                .into());
            }
        }
        self.set_state(LifecycleState::ShuttingDown);
        let mut failures = Vec::new();
        // dispatches that already took a snapshot may still reach these sinks
        for sink in self.chain.clear() {
            if let Err(e) = sink.prepare_to_die() {
                failures.push(e);
            }
        }
        self.external.write(|external| *external = None);
        self.publishers.clear();
        self.set_state(LifecycleState::Shutdown);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures }.into())
        }
    }

    // ------------------------------------------------------------------------------------------
    // severity
    // ------------------------------------------------------------------------------------------

    /**
    Sets the override for `name`.  [Severity::Unset] removes it.

    Returns the previous override, if any.
    */
    pub fn set_level(&self, name: &str, level: Severity) -> Result<Option<Severity>, LoggingError> {
        let _admin = self.admin("set a level")?;
        LoggerName::new(name)?;
        Ok(self.table.write(|table| {
            let previous = table.set(name, level);
            self.override_count.store(table.len(), Ordering::Release);
            previous
        }))
    }

    /// The override set on exactly `name`, ignoring ancestors.
    pub fn level(&self, name: &str) -> Option<Severity> {
        if self.override_count.load(Ordering::Acquire) == 0 {
            return None;
        }
        self.table.read(|table| table.get(name))
    }

    /// Every override, sorted by name.
    pub fn overrides(&self) -> Vec<(String, Severity)> {
        let mut overrides: Vec<(String, Severity)> = self.table.read(|table| {
            table
                .iter()
                .map(|(name, level)| (name.to_string(), level))
                .collect()
        });
        overrides.sort();
        overrides
    }

    pub fn default_level(&self) -> Severity {
        Severity::from_u8(self.default_level.load(Ordering::Acquire)).unwrap_or(DEFAULT_SEVERITY)
    }

    /// Sets the level used where no override applies.  [Severity::Unset] restores the default.
    pub fn set_default_level(&self, level: Severity) -> Result<(), LoggingError> {
        let _admin = self.admin("set the default level")?;
        let level = if level.is_unset() {
            DEFAULT_SEVERITY
        } else {
            level
        };
        self.default_level.store(level.as_u8(), Ordering::Release);
        let external = self.external.read(|external| external.clone());
        if let Some(backend) = external {
            backend.set_level(level)?;
        }
        Ok(())
    }

    /**
    The threshold governing `name`: its own override, else the nearest ancestor's, else the
    default level.
    */
    pub fn effective_level(&self, name: &str) -> Severity {
        if self.override_count.load(Ordering::Acquire) != 0 {
            if let Some(level) = self.table.read(|table| table.resolve(name)) {
                return level;
            }
        }
        self.default_level()
    }

    /// Whether a call on `name` at `severity` would be emitted.  Never allocates or blocks.
    #[inline]
    pub fn is_enabled_for(&self, name: &str, severity: Severity) -> bool {
        !severity.is_unset() && severity >= self.effective_level(name)
    }

    // ------------------------------------------------------------------------------------------
    // output
    // ------------------------------------------------------------------------------------------

    /**
    Replaces the active format.

    Fail-soft: an unusable template installs the default one and returns the reason, which is
    also kept in [LoggingContext::warnings].
    */
    pub fn set_output_format(&self, template: &str) -> Result<Option<FormatError>, LoggingError> {
        let _admin = self.admin("set the output format")?;
        let (program, warning) = FormatProgram::compile_or_default(template);
        let program = Arc::new(program);
        self.format.write(|format| *format = program);
        if let Some(warning) = &warning {
            self.warnings
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ConfigError::from(warning.clone()));
        }
        Ok(warning)
    }

    /// The template of the active format.
    pub fn output_format(&self) -> String {
        self.format.read(|format| format.template().to_string())
    }

    /// Appends `sink` to the chain.
    pub fn add_sink(&self, sink: impl Into<Sink>) -> Result<SinkId, LoggingError> {
        let _admin = self.admin("add a sink")?;
        Ok(self.chain.register(sink.into()))
    }

    /**
    Removes the sink registered as `id` and lets it flush.

    Returns `false` if there was no such sink.
    */
    pub fn remove_sink(&self, id: SinkId) -> Result<bool, LoggingError> {
        let _admin = self.admin("remove a sink")?;
        match self.chain.remove(id) {
            Some(sink) => {
                sink.prepare_to_die()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn sink_count(&self) -> usize {
        self.chain.len()
    }

    /// Installs the allocator used when a message outgrows the inline buffer.
    pub fn set_allocator(&self, allocator: Arc<dyn BufferAllocator>) -> Result<(), LoggingError> {
        let _admin = self.admin("set the allocator")?;
        self.allocator.write(|current| *current = allocator);
        Ok(())
    }

    /// Configuration values that were ignored, oldest first.
    pub fn warnings(&self) -> Vec<ConfigError> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ------------------------------------------------------------------------------------------
    // publishers
    // ------------------------------------------------------------------------------------------

    /// Makes `name` a publishing logger.  Usually reached through [crate::Logger::publishing].
    pub fn register_publisher(
        &self,
        name: &str,
        publisher: Arc<dyn Publisher>,
    ) -> Result<(), LoggingError> {
        let _admin = self.admin("register a publisher")?;
        LoggerName::new(name)?;
        self.publishers.register(name, publisher)
    }

    /// Records a child handle derived from the publishing logger `parent`.
    pub fn derive_publisher(&self, parent: &str, child: &str) -> Result<(), LoggingError> {
        let _admin = self.admin("derive a publisher")?;
        self.publishers.derive(parent, child)
    }

    /**
    Releases one handle on `name`.  Returns `false` if `name` had no entry.

    Allowed in every state, since handles are routinely dropped after shutdown.
    */
    pub fn release_publisher(&self, name: &str) -> bool {
        let _admin = self.admin.lock();
        self.publishers.release(name)
    }

    pub fn publisher_ref_count(&self, name: &str) -> Option<usize> {
        self.publishers.ref_count(name)
    }

    pub fn is_publishing(&self, name: &str) -> bool {
        self.publishers.contains(name)
    }

    // ------------------------------------------------------------------------------------------
    // logging
    // ------------------------------------------------------------------------------------------

    /**
    Emits one record.

    Filtered-out calls return `Ok` without formatting anything.  Before `Ready` the record
    goes to a minimal stderr sink; after shutdown it is dropped.  Errors concern this call
    only: a refused buffer growth, or the sinks that failed while the rest still ran.
    */
    pub fn log(
        &self,
        name: &str,
        severity: Severity,
        location: &CallSite,
        args: fmt::Arguments<'_>,
    ) -> Result<(), LoggingError> {
        if !self.is_enabled_for(name, severity) {
            return Ok(());
        }
        let state = self.state();
        if matches!(
            state,
            LifecycleState::ShuttingDown | LifecycleState::Shutdown
        ) {
            return Ok(());
        }

        let allocator = self.allocator.read(|allocator| allocator.clone());
        let mut message = LogBuffer::new(&*allocator);
        message.write_args(args)?;
        let record = LogRecord::new(
            severity,
            name,
            location,
            SystemTime::now(),
            message.as_str(),
        );
        let format = self.format.read(|format| format.clone());
        let env = SinkEnv {
            format: &format,
            allocator: &*allocator,
            publishers: &self.publishers,
        };
        if state == LifecycleState::Ready {
            self.chain.dispatch(&record, &env)?;
        } else {
            self.fallback
                .consume(&record, &env)
                .map_err(|e: SinkError| DispatchError { failures: vec![e] })?;
        }
        Ok(())
    }
}

impl Default for LoggingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingContext")
            .field("state", &self.state())
            .field("default_level", &self.default_level())
            .field("overrides", &self.override_count.load(Ordering::Relaxed))
            .field("sinks", &self.chain.len())
            .field("publishers", &self.publishers.len())
            .finish_non_exhaustive()
    }
}

/*
Boilerplate notes for LoggingContext:

- Debug: hand-written; the locks and sinks are summarized rather than dumped.
- Default: same as new(), an uninitialized context.
- Clone: NOT implemented; share a context through Arc.
- PartialEq/Eq/Hash: NOT implemented; contexts have identity, not value.
- Send/Sync: automatic.  Every field is an atomic or lock-protected.
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory_backend::InMemoryBackend;
    use std::path::{Path, PathBuf};

    static SITE: CallSite = CallSite::new("ctx_test", "context.rs", 1);

    struct FixedDir(PathBuf);

    impl LogDirResolver for FixedDir {
        fn resolve_log_dir(&self) -> Result<PathBuf, ConfigError> {
            Ok(self.0.clone())
        }
    }

    struct NoDir;

    impl LogDirResolver for NoDir {
        fn resolve_log_dir(&self) -> Result<PathBuf, ConfigError> {
            Err(ConfigError::NoHomeDirectory)
        }
    }

    #[derive(Debug)]
    struct BrokenBackend;

    impl ExternalBackend for BrokenBackend {
        fn initialize(&self, _log_dir: &Path) -> Result<(), SinkError> {
            Err(SinkError::External("disk full".into()))
        }
        fn set_level(&self, _level: Severity) -> Result<(), SinkError> {
            Ok(())
        }
        fn log(&self, _record: &LogRecord<'_>, _line: &str) -> Result<(), SinkError> {
            Ok(())
        }
        fn shutdown(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn memory_config(backend: &Arc<InMemoryBackend>) -> Config {
        Config {
            console_enabled: false,
            external_backend: Some(backend.clone()),
            output_format: Some("{severity} {name} {message}".to_string()),
            ..Config::default()
        }
    }

    fn init_memory(ctx: &LoggingContext, backend: &Arc<InMemoryBackend>) {
        ctx.init_with_resolver(memory_config(backend), &FixedDir(PathBuf::from("/tmp/nodelog")))
            .unwrap();
    }

    #[test]
    fn lifecycle_transitions() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);
        init_memory(&ctx, &backend);
        assert_eq!(ctx.state(), LifecycleState::Ready);

        // idempotent
        init_memory(&ctx, &backend);
        assert_eq!(backend.lifecycle_counts(), (1, 0));
        assert_eq!(ctx.sink_count(), 2);

        ctx.shutdown().unwrap();
        assert_eq!(ctx.state(), LifecycleState::Shutdown);
        assert_eq!(backend.lifecycle_counts(), (1, 1));
        ctx.shutdown().unwrap();
        assert_eq!(backend.lifecycle_counts(), (1, 1));

        assert!(matches!(
            ctx.init(Config::default()),
            Err(LoggingError::Lifecycle(LifecycleError {
                state: LifecycleState::Shutdown,
                ..
            }))
        ));
    }

    #[test]
    fn failed_init_rolls_back() {
        let ctx = LoggingContext::new();
        let config = Config {
            level_overrides: vec![("a".to_string(), Severity::Error)],
            external_backend: Some(Arc::new(BrokenBackend)),
            ..Config::default()
        };
        let err = ctx
            .init_with_resolver(config, &FixedDir(PathBuf::from("/tmp")))
            .unwrap_err();
        assert!(matches!(err, LoggingError::Init { .. }));
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);
        assert_eq!(ctx.sink_count(), 0);
        assert_eq!(ctx.level("a"), None);

        let backend = Arc::new(InMemoryBackend::new());
        assert!(matches!(
            ctx.init_with_resolver(memory_config(&backend), &NoDir),
            Err(LoggingError::Config(ConfigError::NoHomeDirectory))
        ));
        assert_eq!(ctx.state(), LifecycleState::Uninitialized);

        init_memory(&ctx, &backend);
        assert_eq!(ctx.state(), LifecycleState::Ready);
    }

    #[test]
    fn shutdown_before_init_is_terminal() {
        let ctx = LoggingContext::new();
        ctx.shutdown().unwrap();
        assert_eq!(ctx.state(), LifecycleState::Shutdown);
        let err = ctx.set_level("a", Severity::Warn).unwrap_err();
        assert!(matches!(
            err,
            LoggingError::Lifecycle(LifecycleError {
                state: LifecycleState::Shutdown,
                ..
            })
        ));
        ctx.log("a", Severity::Fatal, &SITE, format_args!("dropped"))
            .unwrap();
    }

    #[test]
    fn records_reach_the_backend_in_format() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        init_memory(&ctx, &backend);
        ctx.log("arm.joint", Severity::Warn, &SITE, format_args!("torque {}", 3))
            .unwrap();
        ctx.log("arm.joint", Severity::Debug, &SITE, format_args!("hidden"))
            .unwrap();
        assert_eq!(backend.drain_lines(), vec!["WARN arm.joint torque 3"]);
    }

    #[test]
    fn config_overrides_and_default_level_apply() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        let config = Config {
            default_level: Some(Severity::Error),
            level_overrides: vec![("arm".to_string(), Severity::Debug)],
            ..memory_config(&backend)
        };
        ctx.init_with_resolver(config, &FixedDir(PathBuf::from("/tmp")))
            .unwrap();
        assert_eq!(ctx.default_level(), Severity::Error);
        assert_eq!(backend.level(), Some(Severity::Error));
        assert_eq!(ctx.effective_level("arm.joint"), Severity::Debug);
        assert_eq!(ctx.effective_level("leg"), Severity::Error);
    }

    #[test]
    fn bad_format_is_a_logged_warning() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        let config = Config {
            output_format: Some(String::new()),
            ..memory_config(&backend)
        };
        ctx.init_with_resolver(config, &FixedDir(PathBuf::from("/tmp")))
            .unwrap();
        assert_eq!(
            ctx.warnings(),
            vec![ConfigError::Format(FormatError::Empty)]
        );
        assert_eq!(ctx.output_format(), crate::format::DEFAULT_TEMPLATE);
        let logs = backend.drain_logs();
        assert!(logs.contains("[WARN]"), "{logs}");
        assert!(logs.contains("[nodelog]"), "{logs}");
    }

    #[test]
    fn environment_warnings_reach_the_context() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        let from_env = Config::from_lookup(|key| {
            (key == "NODELOG_LOG_LEVEL_OVERRIDES").then(|| "arm:=loud leg:=error".to_string())
        });
        let config = Config {
            level_overrides: from_env.level_overrides,
            warnings: from_env.warnings,
            ..memory_config(&backend)
        };
        ctx.init_with_resolver(config, &FixedDir(PathBuf::from("/tmp")))
            .unwrap();
        assert_eq!(
            ctx.warnings(),
            vec![ConfigError::InvalidSeverity("loud".to_string())]
        );
        assert_eq!(ctx.effective_level("leg.knee"), Severity::Error);
        assert_eq!(ctx.effective_level("arm"), DEFAULT_SEVERITY);
        assert_eq!(
            backend.drain_lines(),
            vec!["WARN nodelog invalid severity `loud`"]
        );
    }

    #[test]
    fn set_level_and_unset() {
        let ctx = LoggingContext::new();
        assert_eq!(ctx.set_level("a.b", Severity::Error).unwrap(), None);
        assert_eq!(
            ctx.set_level("a.b", Severity::Warn).unwrap(),
            Some(Severity::Error)
        );
        assert_eq!(ctx.level("a.b"), Some(Severity::Warn));
        assert_eq!(ctx.level("a"), None);
        assert_eq!(ctx.effective_level("a.b.c"), Severity::Warn);
        assert_eq!(
            ctx.set_level("a.b", Severity::Unset).unwrap(),
            Some(Severity::Warn)
        );
        assert_eq!(ctx.effective_level("a.b.c"), DEFAULT_SEVERITY);
        assert!(ctx.overrides().is_empty());
        assert!(matches!(
            ctx.set_level("a..b", Severity::Warn),
            Err(LoggingError::Config(ConfigError::InvalidName { .. }))
        ));
    }

    #[test]
    fn default_level_unset_resets() {
        let ctx = LoggingContext::new();
        ctx.set_default_level(Severity::Debug).unwrap();
        assert!(ctx.is_enabled_for("x", Severity::Debug));
        ctx.set_default_level(Severity::Unset).unwrap();
        assert_eq!(ctx.default_level(), DEFAULT_SEVERITY);
        assert!(!ctx.is_enabled_for("x", Severity::Debug));
        assert!(!ctx.is_enabled_for("x", Severity::Unset));
    }

    #[test]
    fn set_output_format_falls_back() {
        let ctx = LoggingContext::new();
        assert_eq!(ctx.set_output_format("{message}").unwrap(), None);
        assert_eq!(ctx.output_format(), "{message}");
        assert_eq!(
            ctx.set_output_format("").unwrap(),
            Some(FormatError::Empty)
        );
        assert_eq!(ctx.output_format(), crate::format::DEFAULT_TEMPLATE);
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn sinks_can_be_added_and_removed() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        init_memory(&ctx, &backend);
        let extra = Arc::new(InMemoryBackend::new());
        let id = ctx.add_sink(ExternalSink::new(extra.clone())).unwrap();
        ctx.log("n", Severity::Info, &SITE, format_args!("both"))
            .unwrap();
        assert!(ctx.remove_sink(id).unwrap());
        assert!(!ctx.remove_sink(id).unwrap());
        assert_eq!(extra.lifecycle_counts(), (0, 1));
        ctx.log("n", Severity::Info, &SITE, format_args!("one"))
            .unwrap();
        assert_eq!(extra.drain_lines(), vec!["INFO n both"]);
        assert_eq!(backend.drain_lines(), vec!["INFO n both", "INFO n one"]);
    }

    #[test]
    fn refused_growth_fails_only_that_call() {
        let ctx = LoggingContext::new();
        let backend = Arc::new(InMemoryBackend::new());
        init_memory(&ctx, &backend);
        ctx.set_allocator(Arc::new(crate::buffer::NoGrowthAllocator))
            .unwrap();
        let long = "x".repeat(crate::buffer::INLINE_CAPACITY + 1);
        assert!(matches!(
            ctx.log("n", Severity::Info, &SITE, format_args!("{long}")),
            Err(LoggingError::Allocation(_))
        ));
        ctx.log("n", Severity::Info, &SITE, format_args!("short"))
            .unwrap();
        assert_eq!(backend.drain_lines(), vec!["INFO n short"]);
    }
}

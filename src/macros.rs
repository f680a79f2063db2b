// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-site macros.
//!
//! Each expansion places its [CallSite](crate::CallSite) in a `static`, so the location is
//! captured once per call site.  The enabled check runs before the format arguments are
//! evaluated: a filtered-out call costs the check and nothing else.
//!
//! The macros take either a [Logger](crate::Logger) (or a reference to one) or
//! `name: "dotted.name"`, which logs through the process-wide context without a handle.
//!
//! ```
//! use nodelog::{log_info, log_warn, LoggingContext, Logger};
//! use std::sync::Arc;
//!
//! let context = Arc::new(LoggingContext::new());
//! let logger = Logger::with_context(context, "arm.joint").unwrap();
//! log_info!(logger, "moved to {:.2} rad", 1.5707);
//! log_warn!(&logger, "torque limit");
//! log_info!(name: "arm", "through the global context");
//! ```
//!
//! Errors from the call are discarded; use [Logger::log](crate::Logger::log) directly to
//! observe them.

/**
Logs at a [Severity](crate::Severity) chosen at runtime.

```
# use nodelog::{log_at, Logger, LoggingContext, Severity};
# use std::sync::Arc;
# let logger = Logger::with_context(Arc::new(LoggingContext::new()), "n").unwrap();
let level = Severity::Error;
log_at!(logger, level, "code {}", 7);
```
*/
#[macro_export]
macro_rules! log_at {
    (name: $name:expr, $severity:expr, $($arg:tt)+) => {{
        let name: &str = $name;
        let severity: $crate::Severity = $severity;
        let context = $crate::context();
        if context.is_enabled_for(name, severity) {
            static CALL_SITE: $crate::CallSite =
                $crate::CallSite::new(module_path!(), file!(), line!());
            let _ = context.log(name, severity, &CALL_SITE, format_args!($($arg)+));
        }
    }};
    ($logger:expr, $severity:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let severity: $crate::Severity = $severity;
        if logger.is_enabled_for(severity) {
            static CALL_SITE: $crate::CallSite =
                $crate::CallSite::new(module_path!(), file!(), line!());
            let _ = logger.log(severity, &CALL_SITE, format_args!($($arg)+));
        }
    }};
}

#[macro_export]
macro_rules! log_debug {
    (name: $name:expr, $($arg:tt)+) => { $crate::log_at!(name: $name, $crate::Severity::Debug, $($arg)+) };
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, $crate::Severity::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_info {
    (name: $name:expr, $($arg:tt)+) => { $crate::log_at!(name: $name, $crate::Severity::Info, $($arg)+) };
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, $crate::Severity::Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_warn {
    (name: $name:expr, $($arg:tt)+) => { $crate::log_at!(name: $name, $crate::Severity::Warn, $($arg)+) };
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, $crate::Severity::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! log_error {
    (name: $name:expr, $($arg:tt)+) => { $crate::log_at!(name: $name, $crate::Severity::Error, $($arg)+) };
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, $crate::Severity::Error, $($arg)+) };
}

#[macro_export]
macro_rules! log_fatal {
    (name: $name:expr, $($arg:tt)+) => { $crate::log_at!(name: $name, $crate::Severity::Fatal, $($arg)+) };
    ($logger:expr, $($arg:tt)+) => { $crate::log_at!($logger, $crate::Severity::Fatal, $($arg)+) };
}

/**
Whether a call at the given severity would be emitted.  Use it to guard work that only feeds
a log message.

```
# use nodelog::{log_enabled, log_debug, Logger, LoggingContext, Severity};
# use std::sync::Arc;
# let logger = Logger::with_context(Arc::new(LoggingContext::new()), "n").unwrap();
if log_enabled!(logger, Severity::Debug) {
    let summary = (0..1000).sum::<u32>();
    log_debug!(logger, "summary {summary}");
}
assert!(!log_enabled!(name: "n", Severity::Debug));
```
*/
#[macro_export]
macro_rules! log_enabled {
    (name: $name:expr, $severity:expr) => {
        $crate::context().is_enabled_for($name, $severity)
    };
    ($logger:expr, $severity:expr) => {
        $logger.is_enabled_for($severity)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Config, InMemoryBackend, Logger, LoggingContext, Severity};
    use std::cell::Cell;
    use std::sync::Arc;

    fn capture() -> (Logger, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let context = Arc::new(LoggingContext::new());
        context
            .init(Config {
                console_enabled: false,
                publish_enabled: false,
                output_format: Some("{severity}:{message}:{function}".to_string()),
                external_backend: Some(backend.clone()),
                log_directory: Some(std::env::temp_dir()),
                ..Config::default()
            })
            .unwrap();
        (Logger::with_context(context, "macro").unwrap(), backend)
    }

    #[test]
    fn levels_map_to_macros() {
        let (logger, backend) = capture();
        logger.set_level(Severity::Debug).unwrap();
        log_debug!(logger, "d");
        log_info!(logger, "i");
        log_warn!(logger, "w");
        log_error!(logger, "e");
        log_fatal!(logger, "f{}", 1);
        log_at!(&logger, Severity::Warn, "at");
        assert_eq!(
            backend.drain_lines(),
            vec![
                "DEBUG:d:nodelog::macros::tests",
                "INFO:i:nodelog::macros::tests",
                "WARN:w:nodelog::macros::tests",
                "ERROR:e:nodelog::macros::tests",
                "FATAL:f1:nodelog::macros::tests",
                "WARN:at:nodelog::macros::tests",
            ]
        );
    }

    #[test]
    fn disabled_calls_do_not_evaluate_arguments() {
        let (logger, backend) = capture();
        let evaluated = Cell::new(0);
        let count = || {
            evaluated.set(evaluated.get() + 1);
            evaluated.get()
        };
        log_debug!(logger, "{}", count());
        assert_eq!(evaluated.get(), 0);
        log_info!(logger, "{}", count());
        assert_eq!(evaluated.get(), 1);
        assert_eq!(backend.drain_lines().len(), 1);
    }

    #[test]
    fn enabled_macro() {
        let (logger, _backend) = capture();
        assert!(log_enabled!(logger, Severity::Info));
        assert!(!log_enabled!(logger, Severity::Debug));
    }
}

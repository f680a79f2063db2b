// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::context::LoggingContext;
use crate::error::{ConfigError, DeriveError, LoggingError};
use crate::log_record::CallSite;
use crate::name::LoggerName;
use crate::publish_sink::Publisher;
use crate::severity::Severity;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoggerKind {
    /// Created directly from a name.
    Root,
    /// Created with [Logger::derive].
    Child,
}

/**
A handle for logging under one hierarchical name.

A handle is a validated name plus the context it logs into.  Levels are resolved on every
call, so a handle always sees the latest overrides.

# Publishing

A handle created with [Logger::publishing] is a publishing logger: its records are also
handed to its [Publisher].  Children derived from it share that publisher and hold a
reference on the registration, released when the child is dropped.  Deriving from a handle
that is not publishing still yields a working child, returned inside
[DeriveError::NoPublisherForAncestor].

```
use nodelog::{Logger, LoggingContext, Severity};
use std::sync::Arc;

let context = Arc::new(LoggingContext::new());
let arm = Logger::with_context(context.clone(), "arm").unwrap();
let joint = arm.derive("joint").unwrap_err().logger().unwrap();
assert_eq!(joint.name().as_str(), "arm.joint");

context.set_level("arm", Severity::Warn).unwrap();
assert!(!joint.is_enabled_for(Severity::Info));
```
*/
pub struct Logger {
    name: LoggerName,
    context: Arc<LoggingContext>,
    kind: LoggerKind,
    /// holds a reference on a publisher registry entry
    registered: bool,
}

impl Logger {
    /// A root logger on the process-wide context.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        Self::with_context(LoggingContext::global().clone(), name)
    }

    pub fn with_context(context: Arc<LoggingContext>, name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: LoggerName::new(name)?,
            context,
            kind: LoggerKind::Root,
            registered: false,
        })
    }

    /**
    A root logger whose records are also broadcast through `publisher`.

    The registration ends when this handle and every child derived from it are dropped, and
    the publisher is then closed.
    */
    pub fn publishing(
        context: Arc<LoggingContext>,
        name: &str,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, LoggingError> {
        let name = LoggerName::new(name)?;
        context.register_publisher(name.as_str(), publisher)?;
        Ok(Self {
            name,
            context,
            kind: LoggerKind::Root,
            registered: true,
        })
    }

    /**
    Derives the child `child` of this logger, named `<parent>.<child>`.

    When this logger is publishing, the child shares its publisher.  Otherwise the child is
    still created, and handed back in [DeriveError::NoPublisherForAncestor] with no registry
    state changed.  A publishing parent whose context has shut down hands the child back in
    [DeriveError::Lifecycle] instead.
    */
    pub fn derive(&self, child: &str) -> Result<Logger, DeriveError> {
        let name = self.name.child(child)?;
        let shared = if self.registered {
            self.context
                .derive_publisher(self.name.as_str(), name.as_str())
        } else {
            Err(LoggingError::NoPublisherForAncestor {
                ancestor: self.name.as_str().to_string(),
            })
        };
        let logger = Logger {
            name,
            context: self.context.clone(),
            kind: LoggerKind::Child,
            registered: shared.is_ok(),
        };
        let ancestor = self.name.as_str().to_string();
        match shared {
            Ok(()) => Ok(logger),
            Err(LoggingError::Lifecycle(source)) => Err(DeriveError::Lifecycle {
                ancestor,
                source,
                logger,
            }),
            Err(_) => Err(DeriveError::NoPublisherForAncestor { ancestor, logger }),
        }
    }

    pub fn name(&self) -> &LoggerName {
        &self.name
    }

    pub fn kind(&self) -> LoggerKind {
        self.kind
    }

    pub fn context(&self) -> &Arc<LoggingContext> {
        &self.context
    }

    /// Whether this handle holds a publisher registration.
    pub fn is_publishing(&self) -> bool {
        self.registered
    }

    #[inline]
    pub fn is_enabled_for(&self, severity: Severity) -> bool {
        self.context.is_enabled_for(self.name.as_str(), severity)
    }

    pub fn effective_level(&self) -> Severity {
        self.context.effective_level(self.name.as_str())
    }

    /// Sets the override for this logger's name, affecting every handle with this name and
    /// every descendant without an override of its own.
    pub fn set_level(&self, level: Severity) -> Result<Option<Severity>, LoggingError> {
        self.context.set_level(self.name.as_str(), level)
    }

    pub fn log(
        &self,
        severity: Severity,
        location: &CallSite,
        args: fmt::Arguments<'_>,
    ) -> Result<(), LoggingError> {
        self.context
            .log(self.name.as_str(), severity, location, args)
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.registered {
            self.context.release_publisher(self.name.as_str());
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("publishing", &self.registered)
            .finish_non_exhaustive()
    }
}

/*
Boilerplate notes.

# Logger

Clone is not implemented: a publishing handle owns one reference on its registry entry, and a
silent clone would have to take another.  Derive a child or share the handle through Arc.
PartialEq/Eq/Hash would have to pick between comparing names and comparing handles; compare
`name()` instead.
Default makes no sense without a name.
Display: use `name()`.
Send/Sync: automatic, the context is shared through Arc.
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish_sink::{LogMessage, PublishError};

    #[derive(Debug)]
    struct Silent;

    impl Publisher for Silent {
        fn publish(&self, _message: &LogMessage<'_>) -> Result<(), PublishError> {
            Ok(())
        }
    }

    #[test]
    fn derive_builds_dotted_names() {
        let context = Arc::new(LoggingContext::new());
        let root = Logger::publishing(context.clone(), "node", Arc::new(Silent)).unwrap();
        assert_eq!(root.kind(), LoggerKind::Root);
        let child = root.derive("planner").unwrap();
        let grandchild = child.derive("astar").unwrap();
        assert_eq!(grandchild.name().as_str(), "node.planner.astar");
        assert_eq!(grandchild.kind(), LoggerKind::Child);
        assert!(grandchild.is_publishing());
    }

    #[test]
    fn derive_rejects_bad_segments() {
        let context = Arc::new(LoggingContext::new());
        let root = Logger::with_context(context, "node").unwrap();
        assert!(matches!(
            root.derive(""),
            Err(DeriveError::InvalidName(_))
        ));
        assert!(matches!(
            root.derive("a..b"),
            Err(DeriveError::InvalidName(_))
        ));
    }

    #[test]
    fn levels_follow_the_context() {
        let context = Arc::new(LoggingContext::new());
        let logger = Logger::with_context(context.clone(), "sensor.lidar").unwrap();
        assert_eq!(logger.effective_level(), Severity::Info);
        context.set_level("sensor", Severity::Error).unwrap();
        assert_eq!(logger.effective_level(), Severity::Error);
        logger.set_level(Severity::Debug).unwrap();
        assert!(logger.is_enabled_for(Severity::Debug));
        assert_eq!(context.level("sensor.lidar"), Some(Severity::Debug));
    }
}

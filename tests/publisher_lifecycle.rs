// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishing loggers: reference counting across derive and drop, and what reaches the
//! publisher.

#[cfg(test)]
mod tests {
    use nodelog::{
        Config, DeriveError, LogMessage, Logger, LoggingContext, LoggingError, PublishError,
        Publisher, Severity, log_info, log_warn,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Transport {
        sent: Mutex<Vec<(String, Severity, String)>>,
        closed: AtomicUsize,
    }

    impl Publisher for Transport {
        fn publish(&self, message: &LogMessage<'_>) -> Result<(), PublishError> {
            self.sent.lock().unwrap().push((
                message.name.to_string(),
                message.level,
                message.msg.to_string(),
            ));
            Ok(())
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ready() -> Arc<LoggingContext> {
        let context = Arc::new(LoggingContext::new());
        context
            .init(Config {
                console_enabled: false,
                ..Config::default()
            })
            .unwrap();
        context
    }

    #[test]
    fn derive_increments_by_one_and_drop_releases() {
        let context = ready();
        let transport = Arc::new(Transport::default());
        let root = Logger::publishing(context.clone(), "node", transport.clone()).unwrap();
        assert_eq!(context.publisher_ref_count("node"), Some(1));

        let a = root.derive("a").unwrap();
        assert_eq!(context.publisher_ref_count("node"), Some(2));
        assert_eq!(context.publisher_ref_count("node.a"), Some(1));

        let b = root.derive("b").unwrap();
        assert_eq!(context.publisher_ref_count("node"), Some(3));

        let a_again = root.derive("a").unwrap();
        assert_eq!(context.publisher_ref_count("node.a"), Some(2));
        assert_eq!(context.publisher_ref_count("node"), Some(4));

        drop(a);
        drop(a_again);
        assert_eq!(context.publisher_ref_count("node.a"), None);
        drop(b);
        assert_eq!(context.publisher_ref_count("node"), Some(1));
        assert_eq!(transport.closed.load(Ordering::SeqCst), 0);

        drop(root);
        assert_eq!(context.publisher_ref_count("node"), None);
        assert!(!context.is_publishing("node"));
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_publishing_root_changes_nothing() {
        let context = ready();
        let plain = Logger::with_context(context.clone(), "plain").unwrap();
        let before = context.overrides();
        let err = plain.derive("child").unwrap_err();
        match &err {
            DeriveError::NoPublisherForAncestor { ancestor, .. } => assert_eq!(ancestor, "plain"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(context.overrides(), before);
        assert!(!context.is_publishing("plain"));
        assert!(!context.is_publishing("plain.child"));

        // the child still logs; only publishing is skipped
        let child = err.logger().unwrap();
        assert_eq!(child.name().as_str(), "plain.child");
        assert!(!child.is_publishing());
        child
            .log(
                Severity::Warn,
                &nodelog::CallSite::caller(),
                format_args!("still works"),
            )
            .unwrap();
    }

    #[test]
    fn children_broadcast_through_the_root_publisher() {
        let context = ready();
        let transport = Arc::new(Transport::default());
        let root = Logger::publishing(context.clone(), "node", transport.clone()).unwrap();
        let child = root.derive("nav").unwrap();
        let bystander = Logger::with_context(context.clone(), "other").unwrap();

        log_info!(root, "up");
        log_warn!(child, "drift {}", 2);
        log_warn!(bystander, "not broadcast");

        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![
                ("node".to_string(), Severity::Info, "up".to_string()),
                ("node.nav".to_string(), Severity::Warn, "drift 2".to_string()),
            ]
        );
    }

    #[test]
    fn duplicate_publisher_is_rejected() {
        let context = ready();
        let _first =
            Logger::publishing(context.clone(), "node", Arc::new(Transport::default())).unwrap();
        let second = Logger::publishing(context.clone(), "node", Arc::new(Transport::default()));
        assert!(matches!(
            second,
            Err(LoggingError::PublisherAlreadyRegistered { .. })
        ));
        assert_eq!(context.publisher_ref_count("node"), Some(1));
    }

    #[test]
    fn shutdown_closes_publishers_and_later_drops_are_harmless() {
        let context = ready();
        let transport = Arc::new(Transport::default());
        let root = Logger::publishing(context.clone(), "node", transport.clone()).unwrap();
        let child = root.derive("x").unwrap();
        context.shutdown().unwrap();
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
        drop(child);
        drop(root);
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn derive_after_shutdown_reports_the_lifecycle() {
        let context = ready();
        let transport = Arc::new(Transport::default());
        let root = Logger::publishing(context.clone(), "node", transport).unwrap();
        context.shutdown().unwrap();
        let err = root.derive("late").unwrap_err();
        match &err {
            DeriveError::Lifecycle {
                ancestor, source, ..
            } => {
                assert_eq!(ancestor, "node");
                assert_eq!(source.state, nodelog::LifecycleState::Shutdown);
            }
            other => panic!("unexpected {other:?}"),
        }
        let late = err.logger().unwrap();
        assert_eq!(late.name().as_str(), "node.late");
        assert!(!late.is_publishing());
        assert_eq!(context.publisher_ref_count("node.late"), None);
    }

    /// A publisher that logs from inside `publish` must not feed itself.
    #[derive(Debug)]
    struct Chatty {
        context: Arc<LoggingContext>,
        calls: AtomicUsize,
    }

    impl Publisher for Chatty {
        fn publish(&self, message: &LogMessage<'_>) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.context.log(
                message.name,
                Severity::Warn,
                &nodelog::CallSite::caller(),
                format_args!("echo {}", message.msg),
            );
            Ok(())
        }
    }

    #[test]
    fn publisher_that_logs_does_not_recurse() {
        let context = ready();
        let chatty = Arc::new(Chatty {
            context: context.clone(),
            calls: AtomicUsize::new(0),
        });
        let root = Logger::publishing(context.clone(), "loud", chatty.clone()).unwrap();
        log_warn!(root, "once");
        assert_eq!(chatty.calls.load(Ordering::SeqCst), 1);
    }
}

//! Notification sink: where the runtime sends diagnostics instead of failing.
//!
//! Nothing in this crate escalates a bad user script to a panic or a returned
//! error on the query path. Failures are described here and the caller gets an
//! absent result.

use parking_lot::Mutex;
use std::sync::Arc;

/// Receiver for human-readable diagnostics.
///
/// Implementations must not fail or block for long; they are called while
/// the script host lock may be held.
pub trait NotificationSink: Send + Sync {
    /// A failure the user should know about (bad config, missing toUrl).
    fn report_error(&self, message: &str);

    /// Observational detail about what the resolver is doing.
    fn report_debug(&self, message: &str);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn report_error(&self, message: &str) {
        (**self).report_error(message)
    }

    fn report_debug(&self, message: &str) {
        (**self).report_debug(message)
    }
}

/// Sink that forwards to `tracing`.
///
/// Debug messages are only emitted when `debug_enabled` is set, matching the
/// per-project logging toggle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    debug_enabled: bool,
}

impl TracingSink {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }
}

impl NotificationSink for TracingSink {
    fn report_error(&self, message: &str) {
        tracing::error!(target: "reqpath", "{}", message);
    }

    fn report_debug(&self, message: &str) {
        if self.debug_enabled {
            tracing::debug!(target: "reqpath", "{}", message);
        }
    }
}

/// Severity of a recorded notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Debug,
}

/// Sink that keeps every message in memory.
///
/// Useful for embedders that batch diagnostics into their own UI.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded error messages, in arrival order
    pub fn errors(&self) -> Vec<String> {
        self.filtered(Severity::Error)
    }

    /// All recorded debug messages, in arrival order
    pub fn debugs(&self) -> Vec<String> {
        self.filtered(Severity::Debug)
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<(Severity, String)> {
        std::mem::take(&mut *self.messages.lock())
    }

    fn filtered(&self, severity: Severity) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl NotificationSink for CollectingSink {
    fn report_error(&self, message: &str) {
        self.messages.lock().push((Severity::Error, message.to_string()));
    }

    fn report_debug(&self, message: &str) {
        self.messages.lock().push((Severity::Debug, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_separates_severities() {
        let sink = CollectingSink::new();
        sink.report_debug("looking");
        sink.report_error("broken");
        sink.report_debug("found");

        assert_eq!(sink.errors(), vec!["broken".to_string()]);
        assert_eq!(sink.debugs(), vec!["looking".to_string(), "found".to_string()]);

        assert_eq!(sink.take().len(), 3);
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(CollectingSink::new());
        let shared: Arc<dyn NotificationSink> = sink.clone();
        shared.report_error("via arc");
        assert_eq!(sink.errors(), vec!["via arc".to_string()]);
    }
}

//! Configuration types for the embedded script host.
//!
//! These are engine-level knobs. Project-level settings (where require.js and
//! the config file live) are in [`crate::settings`].

use std::time::Duration;

/// Default upper bound for a single engine entry (bootstrap file or query).
pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Script host configuration.
///
/// Controls resource limits applied to the QuickJS runtime backing one
/// [`ScriptHost`](crate::context::ScriptHost).
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Heap limit in bytes for the QuickJS runtime.
    /// Default: None (engine default, unlimited)
    pub memory_limit: Option<usize>,

    /// Maximum native stack size in bytes used by the interpreter.
    /// Default: None (engine default)
    pub max_stack_size: Option<usize>,

    /// Deadline for a single engine entry. A script still running when it
    /// elapses is interrupted.
    /// Default: 5 seconds
    pub eval_timeout: Option<Duration>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            max_stack_size: None,
            eval_timeout: Some(DEFAULT_EVAL_TIMEOUT),
        }
    }
}

impl HostConfig {
    /// Create a new host config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heap limit in bytes.
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the interpreter stack size in bytes.
    pub fn max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = Some(bytes);
        self
    }

    /// Set the evaluation deadline.
    pub fn eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = Some(timeout);
        self
    }

    /// Disable the evaluation deadline entirely.
    pub fn without_timeout(mut self) -> Self {
        self.eval_timeout = None;
        self
    }
}

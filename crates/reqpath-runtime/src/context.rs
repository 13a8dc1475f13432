//! Script host: owns one QuickJS runtime/context pair and its global scope
//!
//! Every engine interaction goes through [`ScriptHost::with_context`], which
//! serializes access per host and guarantees the enter/exit bookkeeping is
//! paired on every exit path.

use crate::config::HostConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::notify::NotificationSink;
use crate::value::extract_exception;
use parking_lot::Mutex;
use rquickjs::context::EvalOptions;
use rquickjs::{CatchResultExt, Context, Ctx, Runtime};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Counters for engine entries on one host
///
/// All counters are atomic and can be read at any time without locking.
#[derive(Debug, Default)]
pub struct HostStats {
    /// Number of times a context was entered
    pub contexts_entered: AtomicU64,
    /// Number of times a context was exited (on any path)
    pub contexts_exited: AtomicU64,
    /// Number of entries interrupted by the deadline
    pub interrupts: AtomicU64,
}

impl HostStats {
    /// Get snapshot of current stats
    pub fn snapshot(&self) -> HostStatsSnapshot {
        HostStatsSnapshot {
            contexts_entered: self.contexts_entered.load(Ordering::Relaxed),
            contexts_exited: self.contexts_exited.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of host statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatsSnapshot {
    pub contexts_entered: u64,
    pub contexts_exited: u64,
    pub interrupts: u64,
}

impl HostStatsSnapshot {
    /// Entries that have not been matched by an exit
    pub fn contexts_open(&self) -> u64 {
        self.contexts_entered.saturating_sub(self.contexts_exited)
    }
}

struct Engine {
    // Dropped after `context`; field order matters.
    context: Context,
    _runtime: Runtime,
}

/// Shared between the host and the QuickJS interrupt handler
#[derive(Default)]
struct Deadline {
    at: Mutex<Option<Instant>>,
    fired: AtomicBool,
}

impl Deadline {
    fn arm(&self, timeout: Option<Duration>) {
        self.fired.store(false, Ordering::Relaxed);
        *self.at.lock() = timeout.map(|t| Instant::now() + t);
    }

    fn disarm(&self) {
        *self.at.lock() = None;
    }

    fn expired(&self) -> bool {
        let expired = matches!(*self.at.lock(), Some(at) if Instant::now() >= at);
        if expired {
            self.fired.store(true, Ordering::Relaxed);
        }
        expired
    }
}

/// One embedded JavaScript engine with a single persistent global scope.
///
/// The host is `Send + Sync`; concurrent callers queue on an internal lock.
/// `with_context` is not re-entrant: calling it from inside its own closure
/// deadlocks.
pub struct ScriptHost {
    engine: Mutex<Engine>,
    deadline: Arc<Deadline>,
    timeout: Option<Duration>,
    stats: HostStats,
}

impl ScriptHost {
    /// Create a fresh runtime with an empty standard global scope
    pub fn new(config: &HostConfig) -> RuntimeResult<Self> {
        let runtime = Runtime::new()
            .map_err(|e| RuntimeError::context_creation(format!("QuickJS runtime: {e}")))?;

        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = config.max_stack_size {
            runtime.set_max_stack_size(size);
        }

        let deadline = Arc::new(Deadline::default());
        let handler_deadline = deadline.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || handler_deadline.expired())));

        let context = Context::full(&runtime)
            .map_err(|e| RuntimeError::context_creation(format!("QuickJS context: {e}")))?;

        debug!(
            memory_limit = ?config.memory_limit,
            timeout_ms = ?config.eval_timeout.map(|t| t.as_millis()),
            "Script host created"
        );

        Ok(Self {
            engine: Mutex::new(Engine {
                context,
                _runtime: runtime,
            }),
            deadline,
            timeout: config.eval_timeout,
            stats: HostStats::default(),
        })
    }

    /// Enter the engine context, run `f`, and exit again.
    ///
    /// The exit bookkeeping runs on every path out of `f`.
    pub fn with_context<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R + Send,
        R: Send,
    {
        let engine = self.engine.lock();

        self.stats.contexts_entered.fetch_add(1, Ordering::Relaxed);
        self.deadline.arm(self.timeout);
        trace!("context entered");

        let _exit = scopeguard::guard((), |_| {
            self.deadline.disarm();
            if self.deadline.fired.load(Ordering::Relaxed) {
                self.stats.interrupts.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.contexts_exited.fetch_add(1, Ordering::Relaxed);
            trace!("context exited");
        });

        engine.context.with(f)
    }

    /// Evaluate script text into the global scope.
    ///
    /// `source_name` is used in error messages only.
    pub fn eval(&self, source: &str, source_name: &str) -> RuntimeResult<()> {
        self.with_context(|ctx| {
            ctx.eval_with_options::<(), _>(source, sloppy_global())
                .catch(&ctx)
                .map_err(|caught| self.classify(extract_exception(caught, source_name)))
        })
    }

    /// Read a file and evaluate it into the global scope, returning any failure.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn try_evaluate_file(&self, path: &Path) -> RuntimeResult<()> {
        let bytes = std::fs::read(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Stray non-UTF-8 bytes (usually in comments) decode to U+FFFD
        let source = String::from_utf8_lossy(&bytes);

        let name = path.display().to_string();
        self.eval(&source, &name)
            .map_err(|e| RuntimeError::script_load(path, e))
    }

    /// Read a file and evaluate it into the global scope.
    ///
    /// Failures are reported to `sink` and swallowed; the host stays usable
    /// with whatever the file managed to define before failing. Returns
    /// whether the evaluation succeeded.
    pub fn evaluate_file(&self, path: &Path, sink: &dyn NotificationSink) -> bool {
        match self.try_evaluate_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Evaluated script file");
                true
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Script file failed");
                sink.report_error(&e.to_string());
                false
            }
        }
    }

    /// Replace an engine error with `Timeout` if the current entry was interrupted.
    ///
    /// Only meaningful inside `with_context`.
    pub(crate) fn classify(&self, err: RuntimeError) -> RuntimeError {
        if self.deadline.fired.load(Ordering::Relaxed) {
            let ms = self.timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
            RuntimeError::Timeout(ms)
        } else {
            err
        }
    }

    /// Engine entry statistics
    pub fn stats(&self) -> HostStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Global-scope, non-strict evaluation: config scripts routinely assign
/// undeclared globals.
fn sloppy_global() -> EvalOptions {
    let mut options = EvalOptions::default();
    options.global = true;
    options.strict = false;
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::Value;

    fn host() -> ScriptHost {
        ScriptHost::new(&HostConfig::default()).unwrap()
    }

    #[test]
    fn test_eval_persists_globals() {
        let host = host();
        host.eval("var answer = 40 + 2;", "<test>").unwrap();

        let answer = host.with_context(|ctx| ctx.globals().get::<_, i32>("answer").unwrap());
        assert_eq!(answer, 42);
    }

    #[test]
    fn test_sloppy_mode_allows_implicit_globals() {
        let host = host();
        host.eval("implicitGlobal = 'yes';", "<test>").unwrap();

        let value = host.with_context(|ctx| ctx.globals().get::<_, String>("implicitGlobal").unwrap());
        assert_eq!(value, "yes");
    }

    #[test]
    fn test_eval_error_is_structured() {
        let host = host();
        let err = host.eval("undefinedFunction();", "broken.js").unwrap_err();

        match err {
            RuntimeError::Script { error_type, message, .. } => {
                assert_eq!(error_type, "ReferenceError");
                assert!(message.contains("undefinedFunction"));
            }
            other => panic!("expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_context_entries_are_paired_after_failure() {
        let host = host();
        let _ = host.eval("throw new Error('boom');", "<test>");
        let _ = host.eval("function(", "<test>");
        host.eval("1", "<test>").unwrap();

        let stats = host.stats();
        assert_eq!(stats.contexts_entered, 3);
        assert_eq!(stats.contexts_open(), 0);
    }

    #[test]
    fn test_infinite_loop_is_interrupted() {
        let host = ScriptHost::new(&HostConfig::new().eval_timeout(Duration::from_millis(50)))
            .unwrap();
        let err = host.eval("while (true) {}", "spin.js").unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert_eq!(host.stats().interrupts, 1);

        // Host is still usable after the interrupt
        host.eval("var after = 1;", "<test>").unwrap();
        let defined = host.with_context(|ctx| {
            !ctx.globals().get::<_, Value>("after").unwrap().is_undefined()
        });
        assert!(defined);
    }
}

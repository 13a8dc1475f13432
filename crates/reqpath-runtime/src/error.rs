//! Error types for reqpath-runtime
//!
//! Most operations in this crate fail soft: they report through a
//! [`NotificationSink`](crate::notify::NotificationSink) and return an absent
//! result. These errors are what the reporting is built from, and what the
//! strict entry points (`ScriptHost::eval`, construction) return directly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while hosting the RequireJS runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Failed to create the QuickJS runtime or context
    #[error("Context creation failed: {message}")]
    ContextCreation { message: String },

    /// A bootstrap file could not be read
    #[error("Failed to read script file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bootstrap file was read but threw (or failed to parse) during evaluation
    #[error("Script error evaluating file '{}': {source}", path.display())]
    ScriptLoad {
        path: PathBuf,
        #[source]
        source: Box<RuntimeError>,
    },

    /// JavaScript exception (throw, TypeError, SyntaxError, etc.)
    #[error("{error_type}: {message}{}", format_location(file, line, column))]
    Script {
        error_type: String,
        message: String,
        file: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
    },

    /// The loaded scope has no usable resolution entry point
    #[error("{0}")]
    ResolverMisconfigured(Misconfiguration),

    /// Evaluation was interrupted by the host deadline
    #[error("Script execution timed out after {0}ms")]
    Timeout(u64),

    /// Internal/unexpected engine error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The distinct ways a loaded scope can lack `require.toUrl`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Misconfiguration {
    /// No `require` object in the global scope
    MissingRequire,
    /// `require` exists but `require.toUrl` is not a function
    MissingToUrl,
}

impl std::fmt::Display for Misconfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequire => f.write_str(
                "Global require object not found (did require.js load?)",
            ),
            Self::MissingToUrl => f.write_str(
                "require.toUrl() not found (check your RequireJS version)",
            ),
        }
    }
}

/// Format location for error display
fn format_location(file: &Option<String>, line: &Option<u32>, column: &Option<u32>) -> String {
    match (file, line, column) {
        (Some(f), Some(l), Some(c)) => format!(" at {}:{}:{}", f, l, c),
        (Some(f), Some(l), None) => format!(" at {}:{}", f, l),
        (None, Some(l), Some(c)) => format!(" at line {}:{}", l, c),
        (None, Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}

impl RuntimeError {
    /// Create a script error from error type and message
    pub fn script_error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            error_type: error_type.into(),
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Create a context creation error
    pub fn context_creation(message: impl Into<String>) -> Self {
        Self::ContextCreation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap an evaluation failure with the file it came from
    pub fn script_load(path: impl Into<PathBuf>, source: RuntimeError) -> Self {
        Self::ScriptLoad {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error came from the evaluation deadline
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::ScriptLoad { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

impl From<rquickjs::Error> for RuntimeError {
    fn from(e: rquickjs::Error) -> Self {
        Self::internal(e.to_string())
    }
}

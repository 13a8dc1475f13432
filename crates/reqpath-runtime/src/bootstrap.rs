//! Runtime bootstrapper: populates a script host's global scope with
//! require.js and the project's `require.config(...)` script.

use crate::context::ScriptHost;
use crate::notify::NotificationSink;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};

const BOOTSTRAP_JS: &str = include_str!("bootstrap.js");

/// Files (and overrides) that make up one project's RequireJS setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPaths {
    /// The require.js library itself
    pub require_js: PathBuf,
    /// The project script that calls `require.config(...)`
    pub config: PathBuf,
    /// Forced `baseUrl`, applied after the config script
    pub base_url_override: Option<String>,
}

impl BootstrapPaths {
    pub fn new(require_js: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            require_js: require_js.into(),
            config: config.into(),
            base_url_override: None,
        }
    }

    /// Force `baseUrl` regardless of what the config script sets
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }
}

/// Which bootstrap steps succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootstrapReport {
    pub globals_defined: bool,
    pub require_loaded: bool,
    pub config_loaded: bool,
    /// `None` when no override was requested
    pub base_url_applied: Option<bool>,
}

impl BootstrapReport {
    /// Every requested step succeeded
    pub fn is_complete(&self) -> bool {
        self.globals_defined
            && self.require_loaded
            && self.config_loaded
            && self.base_url_applied.unwrap_or(true)
    }
}

/// Evaluate the stand-in globals, require.js, the config script and the
/// optional baseUrl override into `host`, in that order.
///
/// Each step is independent: a failing step is reported to `sink` and the
/// remaining steps still run against whatever scope exists.
pub fn bootstrap(
    host: &ScriptHost,
    paths: &BootstrapPaths,
    sink: &dyn NotificationSink,
) -> BootstrapReport {
    let _span = info_span!(
        "bootstrap",
        require_js = %paths.require_js.display(),
        config = %paths.config.display()
    )
    .entered();

    let globals_defined = match host.eval(BOOTSTRAP_JS, "<reqpath_bootstrap>") {
        Ok(()) => true,
        Err(e) => {
            sink.report_error(&format!("Failed to define bootstrap globals: {e}"));
            false
        }
    };

    let require_loaded = host.evaluate_file(&paths.require_js, sink);
    let config_loaded = host.evaluate_file(&paths.config, sink);

    let base_url_applied = paths
        .base_url_override
        .as_deref()
        .map(|base_url| apply_base_url(host, base_url, &paths.config, sink));

    let report = BootstrapReport {
        globals_defined,
        require_loaded,
        config_loaded,
        base_url_applied,
    };
    debug!(?report, "Bootstrap finished");
    report
}

fn apply_base_url(
    host: &ScriptHost,
    base_url: &str,
    config: &Path,
    sink: &dyn NotificationSink,
) -> bool {
    let script = base_url_script(base_url);
    match host.eval(&script, "<reqpath_base_url>") {
        Ok(()) => true,
        Err(e) => {
            let err = crate::error::RuntimeError::script_load(config, e);
            sink.report_error(&format!("Failed to override baseUrl: {err}"));
            false
        }
    }
}

fn base_url_script(base_url: &str) -> String {
    // serde_json string quoting is valid JavaScript string literal syntax
    let literal = serde_json::Value::String(base_url.to_string()).to_string();
    format!("require.config({{ baseUrl: {literal} }});")
}

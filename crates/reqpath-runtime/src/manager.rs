//! Owner of the current runtime instance for one project.
//!
//! The manager builds a [`RequireJsRuntime`] lazily from its settings snapshot
//! and drops it as soon as the snapshot's version changes. Queries already in
//! flight keep their `Arc` to the old instance until they finish; new queries
//! never see it.

use crate::config::HostConfig;
use crate::notify::{NotificationSink, TracingSink};
use crate::runtime::RequireJsRuntime;
use crate::settings::{Settings, SettingsListener, SettingsVersion};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

struct ManagerState {
    settings: Settings,
    runtime: Option<Arc<RequireJsRuntime>>,
}

/// Lazily builds and invalidates the runtime for one project
pub struct RuntimeManager {
    project_root: PathBuf,
    host_config: HostConfig,
    sink: Option<Arc<dyn NotificationSink>>,
    state: Mutex<ManagerState>,
}

impl RuntimeManager {
    pub fn new(project_root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            project_root: project_root.into(),
            host_config: HostConfig::default(),
            sink: None,
            state: Mutex::new(ManagerState {
                settings,
                runtime: None,
            }),
        }
    }

    /// Send diagnostics to `sink` instead of a settings-driven [`TracingSink`]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_host_config(mut self, config: HostConfig) -> Self {
        self.host_config = config;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    pub fn version(&self) -> SettingsVersion {
        self.state.lock().settings.version()
    }

    /// The runtime for the current settings, building it on first use.
    ///
    /// `None` when RequireJS evaluation is disabled or the engine could not
    /// be created (reported to the sink). The bootstrap runs without the
    /// state lock held, so settings changes never wait on it.
    pub fn runtime(&self) -> Option<Arc<RequireJsRuntime>> {
        let settings = {
            let state = self.state.lock();
            if !state.settings.runtime_enabled() {
                return None;
            }
            if let Some(runtime) = &state.runtime {
                return Some(runtime.clone());
            }
            state.settings.clone()
        };
        let version = settings.version();

        let sink = self.sink_for(&settings);
        let built = RequireJsRuntime::builder(settings.bootstrap_paths(&self.project_root))
            .host_config(self.host_config.clone())
            .sink(sink.clone())
            .base_dir(settings.base_dir(&self.project_root))
            .build();

        let runtime = match built {
            Ok(runtime) => Arc::new(runtime),
            Err(e) => {
                sink.report_error(&format!("Failed to start RequireJS runtime: {e}"));
                return None;
            }
        };

        let mut state = self.state.lock();
        if state.settings.version() != version {
            // Settings moved on mid-build; this instance is already stale.
            debug!(%version, "Discarding runtime built for superseded settings");
            return Some(runtime);
        }
        match &state.runtime {
            // Another caller finished first; share its instance.
            Some(existing) => Some(existing.clone()),
            None => {
                debug!(%version, "Built RequireJS runtime");
                state.runtime = Some(runtime.clone());
                Some(runtime)
            }
        }
    }

    /// Resolve through the current runtime
    pub fn resolve_path(&self, name: &str) -> Option<String> {
        self.runtime()?.resolve_path(name)
    }

    /// Drop the current runtime; the next query builds a fresh one
    pub fn invalidate(&self) {
        if self.state.lock().runtime.take().is_some() {
            debug!("RequireJS runtime invalidated");
        }
    }

    /// Adopt a new snapshot, invalidating the runtime if its version differs.
    ///
    /// Returns whether the version changed.
    pub fn apply_settings(&self, settings: Settings) -> bool {
        let mut state = self.state.lock();
        if state.settings.version() == settings.version() {
            return false;
        }
        state.settings = settings;
        state.runtime = None;
        debug!(version = %state.settings.version(), "RequireJS settings applied");
        true
    }

    /// Whether a runtime is currently built
    pub fn is_loaded(&self) -> bool {
        self.state.lock().runtime.is_some()
    }

    fn sink_for(&self, settings: &Settings) -> Arc<dyn NotificationSink> {
        match &self.sink {
            Some(sink) => sink.clone(),
            None => Arc::new(TracingSink::new(settings.enable_logging)),
        }
    }
}

impl SettingsListener for RuntimeManager {
    fn settings_changed(&self, settings: &Settings) {
        self.apply_settings(settings.clone());
    }
}

//! Project settings snapshot and change notification.
//!
//! A [`Settings`] value is an immutable snapshot; its [`version`](Settings::version)
//! identifies which runtime instance it produces. [`SettingsStore`] holds the
//! current snapshot and tells registered listeners when the version changes.

use crate::bootstrap::BootstrapPaths;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub const DEFAULT_PUBLIC_PATH: &str = "public";
pub const DEFAULT_CONFIG_FILE_PATH: &str = "main.js";
pub const DEFAULT_BASE_URL: &str = ".";
pub const DEFAULT_REQUIRE_JS_PATH: &str = "public/lib/require.js";

/// RequireJS settings for one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Web root, relative to the project root
    pub public_path: String,

    /// Script calling `require.config(...)`, relative to `public_path`
    pub config_file_path: String,

    /// baseUrl forced when `override_base_url` is set, relative to `public_path`
    pub base_url: String,

    /// The require.js library, relative to the project root
    pub require_js_path: String,

    pub override_base_url: bool,
    pub plugin_enabled: bool,

    /// Evaluate require.js to resolve paths. When off, no runtime is built.
    pub require_js_enabled: bool,

    /// Emit debug notifications
    pub enable_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_path: DEFAULT_PUBLIC_PATH.to_string(),
            config_file_path: DEFAULT_CONFIG_FILE_PATH.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            require_js_path: DEFAULT_REQUIRE_JS_PATH.to_string(),
            override_base_url: false,
            plugin_enabled: false,
            require_js_enabled: false,
            enable_logging: false,
        }
    }
}

/// Identifies a settings snapshot. Equal versions build equivalent runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingsVersion(u64);

impl std::fmt::Display for SettingsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Settings {
    pub fn version(&self) -> SettingsVersion {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SettingsVersion(hasher.finish())
    }

    /// Whether a runtime should exist at all for this snapshot
    pub fn runtime_enabled(&self) -> bool {
        self.plugin_enabled && self.require_js_enabled
    }

    pub fn public_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.public_path)
    }

    pub fn config_file(&self, project_root: &Path) -> PathBuf {
        self.public_dir(project_root).join(&self.config_file_path)
    }

    pub fn require_js_file(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.require_js_path)
    }

    /// Directory resolved paths are relative to
    pub fn base_dir(&self, project_root: &Path) -> PathBuf {
        if self.override_base_url {
            self.public_dir(project_root).join(&self.base_url)
        } else {
            let config = self.config_file(project_root);
            config
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.public_dir(project_root))
        }
    }

    pub fn bootstrap_paths(&self, project_root: &Path) -> BootstrapPaths {
        let paths = BootstrapPaths::new(
            self.require_js_file(project_root),
            self.config_file(project_root),
        );
        if self.override_base_url {
            paths.with_base_url(self.base_url.clone())
        } else {
            paths
        }
    }
}

/// Notified after the settings version changes
pub trait SettingsListener: Send + Sync {
    fn settings_changed(&self, settings: &Settings);
}

/// Handle returned by [`SettingsStore::register_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Current settings plus an explicit listener list
pub struct SettingsStore {
    current: RwLock<Settings>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn SettingsListener>)>>,
    next_id: AtomicU64,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Clone of the current snapshot
    pub fn snapshot(&self) -> Settings {
        self.current.read().clone()
    }

    pub fn version(&self) -> SettingsVersion {
        self.current.read().version()
    }

    pub fn register_listener(&self, listener: Arc<dyn SettingsListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Returns whether a listener was removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Mutate the settings; listeners run only if the version changed.
    ///
    /// Returns whether it changed.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> bool {
        let (changed, snapshot) = {
            let mut current = self.current.write();
            let before = current.version();
            f(&mut current);
            (current.version() != before, current.clone())
        };

        if changed {
            debug!(version = %snapshot.version(), "Settings changed");
            let listeners: Vec<_> = self
                .listeners
                .lock()
                .iter()
                .map(|(_, l)| l.clone())
                .collect();
            for listener in listeners {
                listener.settings_changed(&snapshot);
            }
        }
        changed
    }

    /// Replace the whole snapshot
    pub fn replace(&self, settings: Settings) -> bool {
        self.update(|current| *current = settings)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(AtomicU64);

    impl SettingsListener for Counter {
        fn settings_changed(&self, _settings: &Settings) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_version_tracks_every_field() {
        let base = Settings::default();
        let mut other = base.clone();
        assert_eq!(base.version(), other.version());

        other.enable_logging = true;
        assert_ne!(base.version(), other.version());

        let mut other = base.clone();
        other.config_file_path = "mainRequireJs.js".into();
        assert_ne!(base.version(), other.version());
    }

    #[test]
    fn test_paths_from_defaults() {
        let settings = Settings::default();
        let root = Path::new("/project");

        assert_eq!(settings.config_file(root), Path::new("/project/public/main.js"));
        assert_eq!(
            settings.require_js_file(root),
            Path::new("/project/public/lib/require.js")
        );
        assert_eq!(settings.base_dir(root), Path::new("/project/public"));
        assert!(settings.bootstrap_paths(root).base_url_override.is_none());
    }

    #[test]
    fn test_base_url_override_paths() {
        let settings = Settings {
            override_base_url: true,
            base_url: "js".into(),
            ..Settings::default()
        };
        let root = Path::new("/project");

        assert_eq!(settings.base_dir(root), Path::new("/project/public/js"));
        assert_eq!(
            settings.bootstrap_paths(root).base_url_override.as_deref(),
            Some("js")
        );
    }

    #[test]
    fn test_runtime_enabled_needs_both_switches() {
        let mut settings = Settings::default();
        assert!(!settings.runtime_enabled());
        settings.plugin_enabled = true;
        assert!(!settings.runtime_enabled());
        settings.require_js_enabled = true;
        assert!(settings.runtime_enabled());
    }

    #[test]
    fn test_listeners_only_fire_on_change() {
        let store = SettingsStore::default();
        let counter = Arc::new(Counter(AtomicU64::new(0)));
        let id = store.register_listener(counter.clone());

        assert!(!store.update(|s| s.public_path = DEFAULT_PUBLIC_PATH.into()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        assert!(store.update(|s| s.base_url = "js".into()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        assert!(store.remove_listener(id));
        assert!(!store.remove_listener(id));
        assert!(store.update(|s| s.base_url = "lib".into()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"plugin_enabled": true, "config_file_path": "app.js"}"#)
                .unwrap();
        assert!(settings.plugin_enabled);
        assert_eq!(settings.config_file_path, "app.js");
        assert_eq!(settings.public_path, DEFAULT_PUBLIC_PATH);
    }
}

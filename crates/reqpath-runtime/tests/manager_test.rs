//! Integration tests for runtime ownership and settings-driven invalidation

use reqpath_runtime::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const MINI_REQUIRE: &str = include_str!("fixtures/mini-require.js");

/// A project using the default layout: public/lib/require.js + public/<config>
fn project(configs: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(public.join("lib")).unwrap();
    std::fs::write(public.join("lib").join("require.js"), MINI_REQUIRE).unwrap();
    for (name, source) in configs {
        std::fs::write(public.join(name), source).unwrap();
    }
    dir
}

fn enabled() -> Settings {
    Settings {
        plugin_enabled: true,
        require_js_enabled: true,
        ..Settings::default()
    }
}

fn manager(dir: &TempDir, settings: Settings) -> (RuntimeManager, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let manager = RuntimeManager::new(dir.path(), settings).with_sink(sink.clone());
    (manager, sink)
}

#[test]
fn test_disabled_settings_build_nothing() {
    let dir = project(&[("main.js", "")]);
    let (manager, sink) = manager(&dir, Settings::default());

    assert!(manager.runtime().is_none());
    assert_eq!(manager.resolve_path("app"), None);
    assert!(!manager.is_loaded());
    assert!(sink.errors().is_empty());
}

#[test]
fn test_runtime_is_built_once_and_reused() {
    let dir = project(&[("main.js", "require.config({ baseUrl: 'js' });")]);
    let (manager, _sink) = manager(&dir, enabled());

    let first = manager.runtime().unwrap();
    let second = manager.runtime().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(manager.resolve_path("app").as_deref(), Some("js/app"));
    assert_eq!(first.cached_len(), 1);
}

#[test]
fn test_same_version_keeps_runtime() {
    let dir = project(&[("main.js", "")]);
    let (manager, _sink) = manager(&dir, enabled());

    let before = manager.runtime().unwrap();
    assert!(!manager.apply_settings(enabled()));
    let after = manager.runtime().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn test_settings_change_replaces_runtime_and_cache() {
    let dir = project(&[
        ("mainRequireJs.js", "require.config({ baseUrl: 'one' });"),
        ("mainRequire.js", "require.config({ baseUrl: 'two' });"),
    ]);
    let settings = Settings {
        config_file_path: "mainRequireJs.js".into(),
        ..enabled()
    };
    let (manager, _sink) = manager(&dir, settings.clone());

    let old = manager.runtime().unwrap();
    assert_eq!(manager.resolve_path("app").as_deref(), Some("one/app"));

    assert!(manager.apply_settings(Settings {
        config_file_path: "mainRequire.js".into(),
        ..settings
    }));
    assert!(!manager.is_loaded());

    assert_eq!(manager.resolve_path("app").as_deref(), Some("two/app"));
    let new = manager.runtime().unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert_eq!(new.resolver_stats().engine_calls, 1);

    // A caller still holding the old instance keeps a consistent view
    assert_eq!(old.resolve_path("app").as_deref(), Some("one/app"));
}

#[test]
fn test_store_listener_invalidates_manager() {
    let dir = project(&[("main.js", "")]);
    let store = SettingsStore::new(enabled());
    let sink = Arc::new(CollectingSink::new());
    let manager = Arc::new(RuntimeManager::new(dir.path(), store.snapshot()).with_sink(sink));
    store.register_listener(manager.clone());

    assert_eq!(manager.resolve_path("app").as_deref(), Some("./app"));
    assert!(manager.is_loaded());

    store.update(|s| {
        s.override_base_url = true;
        s.base_url = "lib".into();
    });
    assert!(!manager.is_loaded());
    assert_eq!(manager.version(), store.version());
    assert_eq!(manager.settings(), store.snapshot());
    assert_eq!(manager.resolve_path("app").as_deref(), Some("lib/app"));

    store.update(|s| s.require_js_enabled = false);
    assert_eq!(manager.resolve_path("app"), None);
}

#[test]
fn test_explicit_invalidate_forces_rebuild() {
    let dir = project(&[("main.js", "")]);
    let (manager, _sink) = manager(&dir, enabled());

    let first = manager.runtime().unwrap();
    manager.invalidate();
    assert!(!manager.is_loaded());
    let second = manager.runtime().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_missing_project_files_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let (manager, sink) = manager(&dir, enabled());

    assert!(manager.runtime().is_some());
    assert_eq!(manager.resolve_path("app"), None);
    assert_eq!(sink.errors().len(), 3);
}

#[test]
fn test_settings_change_does_not_wait_for_bootstrap() {
    let slow_config = "var start = Date.now(); while (Date.now() - start < 1000) {}";
    let dir = project(&[("main.js", slow_config)]);
    let (manager, _sink) = manager(&dir, enabled());

    std::thread::scope(|scope| {
        let building = scope.spawn(|| manager.runtime());

        std::thread::sleep(Duration::from_millis(100));
        let started = Instant::now();
        assert!(manager.apply_settings(Settings {
            base_url: "elsewhere".into(),
            ..enabled()
        }));
        assert!(started.elapsed() < Duration::from_millis(500));

        // The caller still gets an instance, but it is not kept
        assert!(building.join().unwrap().is_some());
    });

    assert!(!manager.is_loaded());
}

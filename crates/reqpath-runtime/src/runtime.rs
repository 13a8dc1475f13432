//! Runtime instance: one bootstrapped scope plus its resolution cache
//!
//! A `RequireJsRuntime` is built for one settings snapshot and thrown away
//! when the settings change. Nothing here watches for that; see
//! [`RuntimeManager`](crate::manager::RuntimeManager).

use crate::bootstrap::{BootstrapPaths, BootstrapReport, bootstrap};
use crate::config::HostConfig;
use crate::context::{HostStatsSnapshot, ScriptHost};
use crate::error::RuntimeResult;
use crate::notify::{NotificationSink, TracingSink};
use crate::resolver::{BaseDirProvider, PathResolver, ResolverStatsSnapshot};
use rquickjs::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Builder for creating a RequireJsRuntime with custom configuration
pub struct RuntimeBuilder {
    paths: BootstrapPaths,
    host_config: HostConfig,
    sink: Arc<dyn NotificationSink>,
    base_dir: Option<Box<dyn BaseDirProvider>>,
}

impl RuntimeBuilder {
    /// Set the engine limits
    pub fn host_config(mut self, config: HostConfig) -> Self {
        self.host_config = config;
        self
    }

    /// Set where diagnostics go
    ///
    /// Default is a [`TracingSink`] with debug output disabled.
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the directory resolved paths are reported relative to
    ///
    /// Default is the config script's directory.
    pub fn base_dir(mut self, provider: impl BaseDirProvider + 'static) -> Self {
        self.base_dir = Some(Box::new(provider));
        self
    }

    /// Create the engine and run the bootstrap
    pub fn build(self) -> RuntimeResult<RequireJsRuntime> {
        RequireJsRuntime::new_with_config(self)
    }
}

/// A bootstrapped RequireJS scope answering dependency-path queries
pub struct RequireJsRuntime {
    host: ScriptHost,
    resolver: PathResolver,
    sink: Arc<dyn NotificationSink>,
    paths: BootstrapPaths,
    report: BootstrapReport,
}

impl RequireJsRuntime {
    /// Bootstrap with default host limits and the given sink
    pub fn new(paths: BootstrapPaths, sink: Arc<dyn NotificationSink>) -> RuntimeResult<Self> {
        Self::builder(paths).sink(sink).build()
    }

    pub fn builder(paths: BootstrapPaths) -> RuntimeBuilder {
        RuntimeBuilder {
            paths,
            host_config: HostConfig::default(),
            sink: Arc::new(TracingSink::default()),
            base_dir: None,
        }
    }

    fn new_with_config(builder: RuntimeBuilder) -> RuntimeResult<Self> {
        let RuntimeBuilder {
            paths,
            host_config,
            sink,
            base_dir,
        } = builder;

        let host = ScriptHost::new(&host_config)?;
        let report = bootstrap(&host, &paths, sink.as_ref());

        let resolver = match base_dir {
            Some(provider) => PathResolver::with_boxed_base_dir(provider),
            None => PathResolver::new(config_dir(&paths)),
        };

        info!(
            require_js = %paths.require_js.display(),
            config = %paths.config.display(),
            complete = report.is_complete(),
            "RequireJS runtime ready"
        );

        Ok(Self {
            host,
            resolver,
            sink,
            paths,
            report,
        })
    }

    /// Resolve a dependency name to the extension-less path require.js
    /// would load, or `None`.
    pub fn resolve_path(&self, name: &str) -> Option<String> {
        self.resolver.resolve(&self.host, self.sink.as_ref(), name)
    }

    /// Resolve several names, preserving input order
    pub fn resolve_many<'a, I>(&self, names: I) -> Vec<(String, Option<String>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.resolver.resolve_many(&self.host, self.sink.as_ref(), names)
    }

    /// Whether the loaded scope exposes a callable `require.toUrl`.
    ///
    /// Read-only probe; does not touch the resolution cache or report.
    pub fn has_to_url(&self) -> bool {
        self.host.with_context(|ctx| {
            ctx.globals()
                .get::<_, Value>("require")
                .ok()
                .and_then(|require| require.as_object().cloned())
                .and_then(|require| require.get::<_, Value>("toUrl").ok())
                .is_some_and(|to_url| to_url.is_function())
        })
    }

    pub fn paths(&self) -> &BootstrapPaths {
        &self.paths
    }

    pub fn bootstrap_report(&self) -> BootstrapReport {
        self.report
    }

    pub fn host_stats(&self) -> HostStatsSnapshot {
        self.host.stats()
    }

    pub fn resolver_stats(&self) -> ResolverStatsSnapshot {
        self.resolver.stats()
    }

    /// Names resolved so far, including absent results
    pub fn cached_len(&self) -> usize {
        self.resolver.cache_len()
    }
}

impl std::fmt::Debug for RequireJsRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequireJsRuntime")
            .field("paths", &self.paths)
            .field("report", &self.report)
            .field("cached", &self.resolver.cache_len())
            .finish_non_exhaustive()
    }
}

fn config_dir(paths: &BootstrapPaths) -> PathBuf {
    paths
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default()
}

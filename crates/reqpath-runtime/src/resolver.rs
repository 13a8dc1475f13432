//! Path resolver: answers "where would require.js load this dependency from?"
//!
//! Resolution asks the loaded `require.toUrl` and memoizes the answer per
//! dependency name for the lifetime of the resolver. A name moves from
//! unresolved to resolved exactly once; there is no way back short of
//! discarding the resolver.

use crate::context::ScriptHost;
use crate::error::{Misconfiguration, RuntimeError};
use crate::notify::NotificationSink;
use crate::value::{coerce_string, extract_exception, is_nullish};
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use rquickjs::function::This;
use rquickjs::{CatchResultExt, Ctx, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Supplies the directory resolved paths are relative to.
///
/// Only used to build diagnostics; joining and file lookup belong to the
/// caller.
pub trait BaseDirProvider: Send + Sync {
    fn base_dir(&self) -> Cow<'_, Path>;
}

impl BaseDirProvider for PathBuf {
    fn base_dir(&self) -> Cow<'_, Path> {
        Cow::Borrowed(self.as_path())
    }
}

impl<F> BaseDirProvider for F
where
    F: Fn() -> PathBuf + Send + Sync,
{
    fn base_dir(&self) -> Cow<'_, Path> {
        Cow::Owned(self())
    }
}

/// Statistics about resolver operation
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Calls to `resolve`
    pub queries: AtomicU64,
    /// Queries answered from the cache
    pub cache_hits: AtomicU64,
    /// Invocations of `require.toUrl`
    pub engine_calls: AtomicU64,
    /// Queries that ended absent because of a misconfiguration or exception
    pub failures: AtomicU64,
}

impl ResolverStats {
    /// Get snapshot of current stats
    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            engine_calls: self.engine_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of resolver statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    pub queries: u64,
    pub cache_hits: u64,
    pub engine_calls: u64,
    pub failures: u64,
}

enum Lookup {
    /// Another caller resolved the name while we waited for the host
    Cached(Option<String>),
    Resolved(String),
    /// `toUrl` returned null/undefined
    Unresolvable,
    Misconfigured(Misconfiguration),
    Failed(RuntimeError),
}

/// Memoizing front end to `require.toUrl`
pub struct PathResolver {
    cache: DashMap<String, Option<String>>,
    reported: Mutex<HashSet<Misconfiguration>>,
    base_dir: Box<dyn BaseDirProvider>,
    stats: ResolverStats,
}

impl PathResolver {
    pub fn new(base_dir: impl BaseDirProvider + 'static) -> Self {
        Self::with_boxed_base_dir(Box::new(base_dir))
    }

    pub fn with_boxed_base_dir(base_dir: Box<dyn BaseDirProvider>) -> Self {
        Self {
            cache: DashMap::new(),
            reported: Mutex::new(HashSet::new()),
            base_dir,
            stats: ResolverStats::default(),
        }
    }

    /// Resolve `name` to an extension-less path, or `None` if it cannot be.
    ///
    /// Never fails outward: structural problems are reported to `sink` and
    /// the absent result is cached like any other.
    pub fn resolve(
        &self,
        host: &ScriptHost,
        sink: &dyn NotificationSink,
        name: &str,
    ) -> Option<String> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);
        if name.is_empty() {
            return None;
        }

        if let Some(hit) = self.cache.get(name) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return hit.value().clone();
        }

        let lookup = host.with_context(|ctx| {
            // The host lock serializes misses, so this re-check is the
            // per-name in-flight guard.
            if let Some(hit) = self.cache.get(name) {
                return Lookup::Cached(hit.value().clone());
            }

            let lookup = self.lookup(&ctx, host, sink, name);

            let cached = match &lookup {
                Lookup::Resolved(path) => Some(path.clone()),
                _ => None,
            };
            self.cache.insert(name.to_string(), cached);
            lookup
        });

        match lookup {
            Lookup::Cached(hit) => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                hit
            }
            Lookup::Resolved(path) => {
                sink.report_debug(&format!(
                    "Looking for module '{}' at path '{}/{}'",
                    name,
                    self.base_dir.base_dir().display(),
                    path
                ));
                Some(path)
            }
            Lookup::Unresolvable => {
                trace!(name, "toUrl returned nothing");
                None
            }
            Lookup::Misconfigured(kind) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                if self.reported.lock().insert(kind) {
                    sink.report_error(&RuntimeError::ResolverMisconfigured(kind).to_string());
                }
                None
            }
            Lookup::Failed(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                sink.report_error(&format!("require.toUrl failed for module '{name}': {e}"));
                None
            }
        }
    }

    fn lookup<'js>(
        &self,
        ctx: &Ctx<'js>,
        host: &ScriptHost,
        sink: &dyn NotificationSink,
        name: &str,
    ) -> Lookup {
        let require = match ctx.globals().get::<_, Value>("require") {
            Ok(value) => value,
            Err(_) => return Lookup::Misconfigured(Misconfiguration::MissingRequire),
        };
        let Some(require) = require.as_object().cloned() else {
            return Lookup::Misconfigured(Misconfiguration::MissingRequire);
        };
        let to_url = match require.get::<_, Value>("toUrl").catch(ctx) {
            Ok(value) => value,
            Err(caught) => {
                return Lookup::Failed(host.classify(extract_exception(caught, "require.toUrl")));
            }
        };
        let Some(to_url) = to_url.as_function().cloned() else {
            return Lookup::Misconfigured(Misconfiguration::MissingToUrl);
        };

        sink.report_debug(&format!(
            "Attempting to load module '{name}' from require config."
        ));
        self.stats.engine_calls.fetch_add(1, Ordering::Relaxed);

        // toUrl strips whatever follows the last '.', assuming it is a file
        // extension. Give it an empty one to strip.
        let arg = format!("{name}.");
        let result = match to_url.call::<_, Value>((This(require), arg)).catch(ctx) {
            Ok(value) => value,
            Err(caught) => {
                return Lookup::Failed(host.classify(extract_exception(caught, "require.toUrl")));
            }
        };
        if is_nullish(&result) {
            return Lookup::Unresolvable;
        }
        match coerce_string(&result) {
            Ok(path) => Lookup::Resolved(strip_trailing_dots(&path).into_owned()),
            Err(e) => Lookup::Failed(e),
        }
    }

    /// Resolve several names, preserving input order
    pub fn resolve_many<'a, I>(
        &self,
        host: &ScriptHost,
        sink: &dyn NotificationSink,
        names: I,
    ) -> Vec<(String, Option<String>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| (name.to_string(), self.resolve(host, sink, name)))
            .collect()
    }

    /// The cached answer for `name`, if it has been resolved.
    ///
    /// The outer `Option` is "resolved yet?", the inner one is the result.
    pub fn cached(&self, name: &str) -> Option<Option<String>> {
        self.cache.get(name).map(|entry| entry.value().clone())
    }

    /// Number of names resolved so far (including absent results)
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Remove the synthetic extension marker left after `toUrl`.
pub fn strip_trailing_dots(path: &str) -> Cow<'_, str> {
    static TRAILING_DOTS: OnceLock<Regex> = OnceLock::new();

    let pattern = TRAILING_DOTS.get_or_init(|| Regex::new(r"\.+$").expect("valid regex"));
    pattern.replace(path, "")
}

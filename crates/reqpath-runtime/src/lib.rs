//! reqpath-runtime - resolve RequireJS dependency names with the project's
//! own require.js.
//!
//! Rather than reimplementing RequireJS path resolution (`baseUrl`, `paths`,
//! `map`, shims), this crate boots an embedded QuickJS engine, evaluates the
//! project's require.js and `require.config(...)` script into it, and asks the
//! real `require.toUrl` where a module lives.
//!
//! # Features
//!
//! - **Real resolution**: answers are whatever the loaded require.js returns
//! - **Fails soft**: bad config files are reported, never raised to the caller
//! - **Memoized**: each dependency name reaches the engine at most once per instance
//! - **Thread-safe**: engine access is serialized per instance
//!
//! # Example
//!
//! ```no_run
//! use reqpath_runtime::{BootstrapPaths, RequireJsRuntime, TracingSink};
//! use std::sync::Arc;
//!
//! let paths = BootstrapPaths::new("public/lib/require.js", "public/main.js");
//! let runtime = RequireJsRuntime::new(paths, Arc::new(TracingSink::new(true))).unwrap();
//!
//! if let Some(path) = runtime.resolve_path("blocks/block") {
//!     println!("blocks/block -> {path}");
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RuntimeManager                            │
//! │  settings snapshot ──version──> Option<Arc<RequireJsRuntime>>│
//! └─────────────────────────────────────────────────────────────┘
//!                           ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RequireJsRuntime                          │
//! │  bootstrap: stand-in globals → require.js → config script   │
//! │  PathResolver: cache → require.toUrl(name + ".")            │
//! └─────────────────────────────────────────────────────────────┘
//!                           ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ScriptHost                                │
//! │  - QuickJS runtime + one persistent global scope            │
//! │  - with_context: serialized, paired enter/exit, deadline    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod notify;
pub mod resolver;
pub mod runtime;
pub mod settings;
pub mod value;

pub use bootstrap::{BootstrapPaths, BootstrapReport, bootstrap};
pub use config::HostConfig;
pub use context::{HostStatsSnapshot, ScriptHost};
pub use error::{Misconfiguration, RuntimeError, RuntimeResult};
pub use manager::RuntimeManager;
pub use notify::{CollectingSink, NotificationSink, Severity, TracingSink};
pub use resolver::{BaseDirProvider, PathResolver, ResolverStatsSnapshot, strip_trailing_dots};
pub use runtime::{RequireJsRuntime, RuntimeBuilder};
pub use settings::{ListenerId, Settings, SettingsListener, SettingsStore, SettingsVersion};

pub mod prelude {
    pub use crate::bootstrap::{BootstrapPaths, BootstrapReport};
    pub use crate::config::HostConfig;
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::manager::RuntimeManager;
    pub use crate::notify::{CollectingSink, NotificationSink, TracingSink};
    pub use crate::runtime::{RequireJsRuntime, RuntimeBuilder};
    pub use crate::settings::{Settings, SettingsListener, SettingsStore};
}

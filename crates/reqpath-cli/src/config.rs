//! Configuration file parsing for reqpath.toml.

use reqpath_runtime::{HostConfig, Settings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names searched for, in order
const CONFIG_NAMES: &[&str] = &["reqpath.toml", ".reqpathrc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Project RequireJS settings
    #[serde(default)]
    pub requirejs: Settings,

    /// Engine limits
    #[serde(default)]
    pub host: HostSection,
}

/// Engine limits as written in the config file.
#[derive(Debug, Default, Deserialize)]
pub struct HostSection {
    /// Evaluation timeout in milliseconds (0 = no timeout)
    pub timeout_ms: Option<u64>,

    /// Engine heap limit in bytes
    pub memory_limit: Option<usize>,

    /// Engine stack limit in bytes
    pub max_stack_size: Option<usize>,
}

impl HostSection {
    /// Build engine limits; `timeout_ms` from the command line wins.
    pub fn host_config(&self, timeout_ms: Option<u64>) -> HostConfig {
        let mut config = HostConfig::new();
        if let Some(bytes) = self.memory_limit {
            config = config.memory_limit(bytes);
        }
        if let Some(bytes) = self.max_stack_size {
            config = config.max_stack_size(bytes);
        }
        match timeout_ms.or(self.timeout_ms) {
            Some(0) => config.without_timeout(),
            Some(ms) => config.eval_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

/// A parsed config plus the file it came from, if any.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

/// Load configuration from a file or search for default config files
/// starting at `search_from`.
pub fn load_config(path: Option<&Path>, search_from: &Path) -> anyhow::Result<LoadedConfig> {
    let config_path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => find_config_file(search_from),
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            Ok(LoadedConfig {
                config,
                path: Some(path),
            })
        }
        None => Ok(LoadedConfig::default()),
    }
}

/// Search for a configuration file in `start` and its parent directories.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}

//! Resolve command - print where require.js would load each dependency.

use anyhow::Result;
use clap::Args;
use reqpath_runtime::RequireJsRuntime;

/// Printed for names require.js has no path for
const UNRESOLVED: &str = "<unresolved>";

#[derive(Args)]
pub struct ResolveCommand {
    /// Dependency names, as written in `define([...])` / `require([...])`
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,

    /// Print a JSON object mapping each name to its path (or null)
    #[arg(long)]
    pub json: bool,
}

impl ResolveCommand {
    pub fn run(&self, runtime: &RequireJsRuntime) -> Result<()> {
        let results = runtime.resolve_many(self.names.iter().map(String::as_str));

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results_json(results))?);
            return Ok(());
        }

        for line in format_lines(&results) {
            println!("{line}");
        }
        Ok(())
    }
}

/// `{ name: path | null }`
fn results_json(results: Vec<(String, Option<String>)>) -> serde_json::Value {
    let object: serde_json::Map<String, serde_json::Value> = results
        .into_iter()
        .map(|(name, path)| (name, path.map_or(serde_json::Value::Null, Into::into)))
        .collect();
    serde_json::Value::Object(object)
}

fn format_lines(results: &[(String, Option<String>)]) -> Vec<String> {
    results
        .iter()
        .map(|(name, path)| format!("{name} -> {}", path.as_deref().unwrap_or(UNRESOLVED)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqpath_runtime::{BootstrapPaths, CollectingSink};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_format_lines() {
        let results = vec![
            ("jquery".to_string(), Some("public/lib/jquery.min".to_string())),
            ("missing".to_string(), None),
        ];
        assert_eq!(
            format_lines(&results),
            vec!["jquery -> public/lib/jquery.min", "missing -> <unresolved>"]
        );
    }

    #[test]
    fn test_json_maps_names_to_paths_or_null() {
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("require.js");
        let main = dir.path().join("main.js");
        std::fs::write(
            &lib,
            "require = { toUrl: function (s) { return s === 'gone.' ? null : 'js/' + s; } };",
        )
        .unwrap();
        std::fs::write(&main, "").unwrap();
        let runtime =
            RequireJsRuntime::new(BootstrapPaths::new(lib, main), Arc::new(CollectingSink::new()))
                .unwrap();

        let value = results_json(runtime.resolve_many(["app", "gone"]));
        assert_eq!(value, serde_json::json!({ "app": "js/app", "gone": null }));
    }
}

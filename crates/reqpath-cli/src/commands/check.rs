//! Check command - bootstrap the project and report what loaded.

use anyhow::Result;
use clap::Args;
use reqpath_runtime::RequireJsRuntime;

#[derive(Args)]
pub struct CheckCommand {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    /// Fails when the loaded scope has no callable `require.toUrl`
    pub fn run(&self, runtime: &RequireJsRuntime) -> Result<()> {
        let paths = runtime.paths();
        let report = runtime.bootstrap_report();
        let has_to_url = runtime.has_to_url();
        let host = runtime.host_stats();
        let resolver = runtime.resolver_stats();

        if self.json {
            let value = report_json(runtime);
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("require.js:  {} ({})", paths.require_js.display(), status(report.require_loaded));
            println!("config:      {} ({})", paths.config.display(), status(report.config_loaded));
            if let (Some(base_url), Some(applied)) = (&paths.base_url_override, report.base_url_applied) {
                println!("baseUrl:     {base_url} ({})", status(applied));
            }
            println!("toUrl:       {}", if has_to_url { "callable" } else { "missing" });
            println!(
                "engine:      {} entries, {} interrupted",
                host.contexts_entered, host.interrupts
            );
            println!(
                "resolver:    {} queries, {} cached names",
                resolver.queries,
                runtime.cached_len()
            );
        }

        if !has_to_url {
            anyhow::bail!("require.toUrl() is not callable; dependency names cannot be resolved");
        }
        Ok(())
    }
}

/// Machine-readable form of the check report
fn report_json(runtime: &RequireJsRuntime) -> serde_json::Value {
    let paths = runtime.paths();
    let report = runtime.bootstrap_report();
    let host = runtime.host_stats();
    serde_json::json!({
        "require_js": paths.require_js,
        "config": paths.config,
        "base_url_override": paths.base_url_override,
        "require_loaded": report.require_loaded,
        "config_loaded": report.config_loaded,
        "base_url_applied": report.base_url_applied,
        "to_url_callable": runtime.has_to_url(),
        "contexts_entered": host.contexts_entered,
        "interrupts": host.interrupts,
    })
}

fn status(ok: bool) -> &'static str {
    if ok { "loaded" } else { "failed" }
}

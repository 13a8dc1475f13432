mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check::CheckCommand, resolve::ResolveCommand};
use reqpath_runtime::{RequireJsRuntime, RuntimeManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reqpath",
    version,
    about = "Resolve RequireJS dependency names with the project's require.js"
)]
struct Cli {
    /// Project root (default: directory of the config file, else cwd)
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Config file (default: reqpath.toml or .reqpathrc.toml in cwd or a parent)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// require.js location, relative to the project root
    #[arg(long = "require-js", global = true, value_name = "PATH")]
    require_js: Option<String>,

    /// Script calling require.config(), relative to the public path
    #[arg(long, global = true, value_name = "PATH")]
    main: Option<String>,

    /// Evaluation timeout in milliseconds (0 = no timeout)
    #[arg(long = "timeout-ms", global = true)]
    timeout_ms: Option<u64>,

    /// Show debug output, including each resolution
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve dependency names to paths
    Resolve(ResolveCommand),
    /// Bootstrap the project and report whether require.toUrl is usable
    Check(CheckCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let search_from = cli.project.clone().unwrap_or_else(|| cwd.clone());
    let loaded = config::load_config(cli.config.as_deref(), &search_from)?;

    let mut settings = loaded.config.requirejs;
    // Running the command is the opt-in; the editor switches don't apply here
    settings.plugin_enabled = true;
    settings.require_js_enabled = true;
    settings.enable_logging |= cli.verbose;
    if let Some(require_js) = &cli.require_js {
        settings.require_js_path = require_js.clone();
    }
    if let Some(main) = &cli.main {
        settings.config_file_path = main.clone();
    }

    let level = if settings.enable_logging { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let project_root = cli
        .project
        .clone()
        .or_else(|| loaded.path.as_ref().and_then(|p| p.parent()).map(PathBuf::from))
        .unwrap_or(cwd);

    let manager = RuntimeManager::new(project_root, settings)
        .with_host_config(loaded.config.host.host_config(cli.timeout_ms));
    let runtime = start_runtime(&manager)?;

    match &cli.command {
        Commands::Resolve(cmd) => cmd.run(&runtime),
        Commands::Check(cmd) => cmd.run(&runtime),
    }
}

fn start_runtime(manager: &RuntimeManager) -> Result<Arc<RequireJsRuntime>> {
    manager.runtime().ok_or_else(|| {
        anyhow::anyhow!(
            "RequireJS runtime could not be started for {}",
            manager.project_root().display()
        )
    })
}

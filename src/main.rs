use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reposnap::config::LoggingConfig;
use reposnap::{Config, Overrides, Policy, Strategy, SyncEngine, SyncResult};

#[derive(Parser)]
#[command(name = "reposnap")]
#[command(about = "Fetch branch snapshots of configured repositories into a target directory")]
#[command(version)]
struct Cli {
    /// Target directory (overrides target_directory from the configuration)
    target: Option<PathBuf>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// What to do with destinations that already exist
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// Repository to sync as owner/name; repeat to sync several (replaces the configured list)
    #[arg(short, long = "repo", value_name = "OWNER/NAME")]
    repos: Vec<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.logging)?;
    info!("Starting reposnap v{}", env!("CARGO_PKG_VERSION"));

    let overrides = Overrides {
        target_directory: cli.target,
        strategy: cli.strategy,
        policy: cli.policy,
        repositories: cli.repos,
    };
    let settings = config.resolve(&overrides)?;
    let target = settings.target.root_directory.clone();

    let engine = SyncEngine::new(settings)?;
    let summary = engine.run().await?;

    println!();
    println!("Target: {}", target.display());
    println!("   Total repositories: {}", summary.total_repositories);
    println!("   Installed: {}", summary.installed);
    println!("   Skipped: {}", summary.skipped);
    println!("   Failed: {}", summary.failed);
    println!("   Duration: {:.2}s", summary.duration.as_secs_f64());

    if summary.failed > 0 {
        println!();
        println!("Failed repositories:");
        for result in &summary.results {
            if let SyncResult::Failed { repository, error } = result {
                println!("   {}: {}", repository, error);
            }
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level and configuration
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer().with_ansi(logging.color);
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "full" {
        registry.with(layer).init();
    } else {
        registry.with(layer.compact()).init();
    }

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

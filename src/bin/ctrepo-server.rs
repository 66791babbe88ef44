//! CTRepo validation service.

use anyhow::Result;
use clap::Parser;
use ctrepo_guard::{GuardConfig, server, telemetry};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "ctrepo-server")]
#[command(about = "HTTP service validating protocol updates for clinical trial repositories")]
#[command(version)]
struct Args {
    #[arg(long, help = "Path to ctrepo.yaml")]
    config: Option<PathBuf>,
    #[arg(long, help = "Listen address, overrides the config file")]
    bind: Option<String>,
    #[arg(long, help = "Directory containing .ctrepo repositories")]
    repo_root: Option<PathBuf>,
    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
    #[arg(long, help = "Emit JSON-formatted log lines")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(args.json_logs, level);

    let mut config = match args.config {
        Some(path) => GuardConfig::from_yaml_file(path)?,
        None => GuardConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(repo_root) = args.repo_root {
        config.repo_root = repo_root;
    }

    server::serve(&config).await
}

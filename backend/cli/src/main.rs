mod config_cmd;
mod doctor_cmd;
mod run_cmd;
mod scan_cmd;
mod settings;
mod terminal_output;
mod wiring;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagesight_config::{config_file_path, load_and_prepare, PageSightConfig};
use pagesight_logging::init_logger;

#[derive(Parser)]
#[command(name = "pagesight")]
#[command(about = "PageSight: hear the page you are looking at")]
#[command(version)]
struct Cli {
    /// Config file (default: $PAGESIGHT_CONFIG or ~/.pagesight/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session against the running Chrome
    Run,
    /// Scan the active tab once and print the snapshot as JSON
    Scan {
        /// Print the snapshot as scanned, without image descriptions
        #[arg(long)]
        no_enrich: bool,
    },
    /// Print the effective config with credentials masked
    Config {
        /// Write a starter config file instead
        #[arg(long)]
        init: bool,
        /// Allow --init to replace an existing file
        #[arg(long, requires = "init")]
        force: bool,
    },
    /// Check the config and the Chrome connection
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config_file_path);

    if let Commands::Config { init: true, force } = cli.command {
        init_logger(None::<&str>, cli.log_level.as_deref().unwrap_or("warn"));
        return config_cmd::init(&path, force).await;
    }

    let config = load_and_prepare(&path).await?;
    init_logging(&config, cli.log_level.as_deref());

    match cli.command {
        Commands::Run => run_cmd::run(config).await,
        Commands::Scan { no_enrich } => scan_cmd::run(config, no_enrich).await,
        Commands::Config { .. } => config_cmd::show(&config),
        Commands::Doctor => doctor_cmd::run(&config).await,
    }
}

fn init_logging(config: &PageSightConfig, override_level: Option<&str>) {
    let logging = config.logging.clone().unwrap_or_default();
    let level = override_level
        .map(str::to_string)
        .or(logging.level)
        .unwrap_or_else(|| pagesight_config::defaults::DEFAULT_LOG_LEVEL.to_string());
    init_logger(logging.dir.as_deref(), &level);
}

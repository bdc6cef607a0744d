use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "moot")]
#[command(about = "MOOT CLI - live-session telemetry for mock courtroom rehearsal", long_about = None)]
struct Cli {
    /// Directory holding config.toml and secret.json (default: ~/.config/moot)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the analysis backend status
    Status,
    /// Print the aggregate report for everything analysed so far
    Summary,
    /// Analyse a single image and print the coaching suggestion
    Analyze {
        image: PathBuf,
        /// Ask the backend to keep the frame
        #[arg(long)]
        save: bool,
    },
    /// Run the telemetry loop headless over the images in a directory
    Watch {
        dir: PathBuf,
        /// Seconds between captures (default: from config)
        #[arg(long)]
        period: Option<f64>,
        /// Stop after this many analysed frames (default: one pass over the directory)
        #[arg(long)]
        frames: Option<u64>,
        /// Stop once this many analyses have failed
        #[arg(long, default_value_t = commands::watch::DEFAULT_MAX_FAILURES)]
        max_failures: u64,
    },
    /// Issue a persona session token to check credentials
    Token {
        /// Persona preset id (default: from config)
        #[arg(long)]
        preset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = commands::utils::load_config(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Status => commands::status::run(&config).await?,
        Commands::Summary => commands::summary::run(&config).await?,
        Commands::Analyze { image, save } => commands::analyze::run(&config, &image, save).await?,
        Commands::Watch {
            dir,
            period,
            frames,
            max_failures,
        } => commands::watch::run(&config, &dir, period, frames, max_failures).await?,
        Commands::Token { preset } => {
            commands::token::run(&config, cli.config_dir.as_deref(), preset.as_deref()).await?
        }
    }

    Ok(())
}

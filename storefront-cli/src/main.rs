//! Storefront CLI - replays escrow command scripts

mod script;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use storefront_escrow::StorefrontConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use script::Replay;

pub(crate) const DEMO_SCRIPT: &str = include_str!("../../demos/escrow-lifecycle.json");

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Escrow-settled storefront ledger")]
struct Cli {
    /// Configuration file (TOML or JSON); STOREFRONT_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON script of commands, queries and clock moves
    Replay {
        script: PathBuf,
        /// Replay clock start (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },
    /// Replay the bundled purchase/delivery/refund walkthrough
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StorefrontConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let (source, start) = match cli.command {
        Commands::Replay { script, start } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            (text, start.unwrap_or_else(Utc::now))
        }
        Commands::Demo => (DEMO_SCRIPT.to_string(), Utc::now()),
    };

    let steps = Replay::parse(&source).context("parsing script")?;
    info!("Replaying {} steps from {}", steps.len(), start);

    let replay = Replay::new(config, start)?;
    let mut stdout = std::io::stdout().lock();
    replay.run(steps, &mut stdout).await?;

    Ok(())
}

//! # Seeder
//!
//! Crawls a Bitcoin-family peer-to-peer network and keeps a
//! reliability-ranked address store for a DNS seed front-end.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line and load configuration (file, then `--seed`s)
//! 2. Install logging (`RUST_LOG` wins over `log.level`)
//! 3. Restore the address store snapshot (optionally clearing ignores)
//! 4. Resolve and admit seeds, spawn crawler + housekeeping
//! 5. Run until Ctrl+C, then stop workers and write a final snapshot

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use seeder_runtime::{load_config, SeederRuntime};

#[derive(Debug, Parser)]
#[command(name = "seeder", version, about = "DNS seed crawler")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "SEEDER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Extra seed, `host` or `host:port`. May be repeated.
    #[arg(short, long = "seed", value_name = "HOST:PORT")]
    seeds: Vec<String>,

    /// Clear every ignore cooldown in the restored store, e.g. after a
    /// local network outage made healthy peers look dead.
    #[arg(long)]
    reset_ignores: bool,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?,
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.seeds)?;
    init_logging(&config.log.level)?;

    let mut runtime = SeederRuntime::new(config);
    if cli.reset_ignores {
        runtime.store().reset_ignores();
    }
    runtime.start().await?;

    info!("Seeder is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await?;
    Ok(())
}

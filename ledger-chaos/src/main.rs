//! # ledger-chaos
//!
//! Crash/restart chaos harness for the blockdb ledger service.
//!
//! ## Commands
//!
//! - `run`: Seed accounts, run random transfers while the service is
//!   repeatedly killed and restarted, then check the total balance
//! - `op`: Issue a single ledger operation
//!
//! ## Example
//!
//! ```bash
//! # Full run with the defaults (10 accounts x 10000, 10000 transfers)
//! ledger-chaos run
//!
//! # Smaller, reproducible run that fails on a mismatch
//! ledger-chaos --config harness.toml run --transfers 500 --seed 7 --strict
//!
//! # Poke at the service
//! ledger-chaos --address 127.0.0.1:50051 op get user_42
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ledger_chaos::config::HarnessConfig;

mod commands;

use commands::{op, run};

/// Configuration file picked up when `--config` is not given.
const DEFAULT_CONFIG: &str = "harness.toml";

/// Chaos harness for the blockdb ledger service.
#[derive(Parser, Debug)]
#[command(name = "ledger-chaos")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Harness configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service address (ip:port); overrides the configuration
    #[arg(long, global = true)]
    address: Option<String>,

    /// Log every RPC
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the workload under repeated crash/restart and check the total balance
    Run(run::RunArgs),

    /// Issue a single ledger operation
    Op {
        #[command(subcommand)]
        op: op::OpCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(address) = cli.address {
        config.endpoint.address = Some(address);
    }

    match cli.command {
        Commands::Run(args) => run::run(config, args).await,
        Commands::Op { op } => op::run(config, op).await,
    }
}

/// Load the explicit config file, else `harness.toml` if present, else defaults.
fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    let config = match path {
        Some(path) => HarnessConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            HarnessConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => HarnessConfig::default(),
    };
    Ok(config)
}

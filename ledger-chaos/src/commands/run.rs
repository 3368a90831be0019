//! Full chaos run: workload under repeated crash/restart.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{error, info, warn};
use uuid::Uuid;

use ledger_chaos::assertions::{assert_conservation, assert_transfers_accounted};
use ledger_chaos::config::{ChaosBackend, HarnessConfig};
use ledger_chaos::process::{DockerProcessControl, ScriptProcessControl};
use ledger_chaos::{Coordinator, RunReport};
use ledger_client::{LedgerClient, TcpTransport};

/// Overrides for the workload and chaos settings of one run.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of accounts (N)
    #[arg(long)]
    accounts: Option<usize>,

    /// Seed balance per account (M)
    #[arg(long)]
    balance: Option<i32>,

    /// Number of transfers (T)
    #[arg(long)]
    transfers: Option<usize>,

    /// RNG seed for a reproducible workload
    #[arg(long)]
    seed: Option<u64>,

    /// How long the service runs before each kill, in milliseconds
    #[arg(long)]
    dwell_ms: Option<u64>,

    /// Exit non-zero if the total balance is not conserved
    #[arg(long)]
    strict: bool,
}

/// Run the chaos command.
pub async fn run(mut config: HarnessConfig, args: RunArgs) -> Result<()> {
    if let Some(accounts) = args.accounts {
        config.workload.accounts = accounts;
    }
    if let Some(balance) = args.balance {
        config.workload.initial_balance = balance;
    }
    if let Some(transfers) = args.transfers {
        config.workload.transfers = transfers;
    }
    if args.seed.is_some() {
        config.workload.seed = args.seed;
    }
    if let Some(dwell_ms) = args.dwell_ms {
        config.chaos.dwell_ms = dwell_ms;
    }
    config.validate()?;

    let address = config.resolve_address()?;
    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        "chaos run against {}: {} accounts x {}, {} transfers, dwell {:?}",
        address,
        config.workload.accounts,
        config.workload.initial_balance,
        config.workload.transfers,
        config.chaos.dwell()
    );

    let client = LedgerClient::new(
        address,
        TcpTransport::with_config(config.client.transport_config()),
        config.client.client_config(),
    );

    let report = match execute(&config, &client).await {
        Ok(report) => report,
        Err(e) => {
            error!(%run_id, "{:#}", e);
            return Err(e);
        }
    };

    let reconciliation = &report.reconciliation;
    println!(
        "{} (expected: {})",
        reconciliation.observed, reconciliation.expected
    );
    info!(
        %run_id,
        "{} chaos cycles, log length {:?}",
        report.cycles,
        reconciliation.log_length
    );

    let conservation = assert_conservation(reconciliation);
    for check in [
        &conservation,
        &assert_transfers_accounted(&reconciliation.transfers),
    ] {
        match &check.failure_details {
            None => info!("PASS {}", check.description),
            Some(details) => warn!("FAIL {}: {}", check.description, details),
        }
    }

    if args.strict && !conservation.passed {
        anyhow::bail!(
            "balance not conserved: {}",
            conservation.failure_details.unwrap_or_default()
        );
    }
    Ok(())
}

async fn execute(config: &HarnessConfig, client: &LedgerClient<TcpTransport>) -> Result<RunReport> {
    let dwell = config.chaos.dwell();
    let workload = config.workload.clone();

    let report = match config.chaos.backend {
        ChaosBackend::Script => {
            let control = ScriptProcessControl::new(
                config.chaos.start_command.clone(),
                config.chaos.kill_command.clone(),
            )?;
            Coordinator::new(control, dwell).run(client, workload).await?
        }
        ChaosBackend::Docker => {
            let container = config
                .chaos
                .container
                .clone()
                .context("chaos.container is required for the docker backend")?;
            let control = DockerProcessControl::new(container)
                .context("Failed to connect to Docker")?;
            Coordinator::new(control, dwell).run(client, workload).await?
        }
    };
    Ok(report)
}

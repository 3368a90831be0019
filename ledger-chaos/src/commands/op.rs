//! Issue a single ledger operation, for poking at the service by hand.

use anyhow::{Context, Result};
use clap::Subcommand;

use ledger_chaos::config::HarnessConfig;
use ledger_client::{AccountId, LedgerClient, TcpTransport};

/// One ledger operation.
#[derive(Subcommand, Debug)]
pub enum OpCommand {
    /// Read a balance
    Get {
        /// Account id
        account: String,
    },
    /// Set a balance
    Put {
        /// Account id
        account: String,
        /// New balance
        value: i32,
    },
    /// Add to a balance
    Deposit {
        /// Account id
        account: String,
        /// Amount
        value: i32,
    },
    /// Subtract from a balance
    Withdraw {
        /// Account id
        account: String,
        /// Amount
        value: i32,
    },
    /// Move funds between accounts
    Transfer {
        /// Source account id
        from: String,
        /// Destination account id
        to: String,
        /// Amount
        value: i32,
    },
    /// Show the service's operation log length
    LogLength,
}

/// Run the op command.
pub async fn run(config: HarnessConfig, op: OpCommand) -> Result<()> {
    let address = config.resolve_address()?;
    let client = LedgerClient::new(
        address,
        TcpTransport::with_config(config.client.transport_config()),
        config.client.client_config(),
    );

    let output = match op {
        OpCommand::Get { account } => client
            .get(&AccountId::new(account))
            .await
            .context("GET failed")?
            .to_string(),
        OpCommand::Put { account, value } => client
            .put(&AccountId::new(account), value)
            .await
            .context("PUT failed")?
            .to_string(),
        OpCommand::Deposit { account, value } => client
            .deposit(&AccountId::new(account), value)
            .await
            .context("DEPOSIT failed")?
            .to_string(),
        OpCommand::Withdraw { account, value } => client
            .withdraw(&AccountId::new(account), value)
            .await
            .context("WITHDRAW failed")?
            .to_string(),
        OpCommand::Transfer { from, to, value } => client
            .transfer(&AccountId::new(from), &AccountId::new(to), value)
            .await
            .context("TRANSFER failed")?
            .to_string(),
        OpCommand::LogLength => client
            .log_length()
            .await
            .context("LOG_LENGTH failed")?
            .to_string(),
    };

    println!("{}", output);
    Ok(())
}

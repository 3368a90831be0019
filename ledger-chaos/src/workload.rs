//! Workload driver: seed accounts, run the transfer storm, reconcile.
//!
//! The three phases are strictly sequential. Seeding and reconciliation
//! retry each call until the service answers, with no deadline; the storm
//! issues each transfer exactly once and never retries it, because a
//! transfer whose response was lost may or may not have been applied.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{info, warn};

use ledger_client::{LedgerClient, Transport};
use ledger_types::AccountId;

/// Shape of one workload run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkloadParams {
    /// Number of accounts (N).
    pub accounts: usize,
    /// Seed balance of every account (M).
    pub initial_balance: i32,
    /// Number of transfers to issue (T).
    pub transfers: usize,
    /// Transfer amounts are drawn from `[1, max_amount]`.
    pub max_amount: i32,
    /// Log progress every this many transfers.
    pub progress_every: usize,
    /// RNG seed for a reproducible run. Random when absent.
    pub seed: Option<u64>,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            accounts: 10,
            initial_balance: 10_000,
            transfers: 10_000,
            max_amount: 100,
            progress_every: 100,
            seed: None,
        }
    }
}

impl WorkloadParams {
    /// The invariant total `N * M`.
    pub fn expected_total(&self) -> i64 {
        self.accounts as i64 * i64::from(self.initial_balance)
    }
}

/// Outcome tally of the transfer storm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Transfers issued.
    pub attempted: usize,
    /// Service answered and applied the transfer.
    pub applied: usize,
    /// Service answered and declined (e.g. insufficient funds).
    pub declined: usize,
    /// No answer; the transfer may or may not have been applied.
    pub failed: usize,
}

/// Final balances compared against the invariant total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Sum of all balances read back from the service.
    pub observed: i64,
    /// `N * M`.
    pub expected: i64,
    /// Accounts that were seeded and read back.
    pub accounts: Vec<AccountId>,
    /// How the storm went.
    pub transfers: TransferStats,
    /// Service log length after reconciliation, if the call succeeded.
    pub log_length: Option<i32>,
}

impl Reconciliation {
    /// Whether the observed total equals the invariant total.
    pub fn is_conserved(&self) -> bool {
        self.observed == self.expected
    }
}

/// Drives one workload run against a ledger client.
pub struct WorkloadDriver<'a, T: Transport> {
    client: &'a LedgerClient<T>,
    params: WorkloadParams,
    rng: StdRng,
}

impl<'a, T: Transport> WorkloadDriver<'a, T> {
    /// Create a driver. Uses `params.seed` when set.
    pub fn new(client: &'a LedgerClient<T>, params: WorkloadParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            client,
            params,
            rng,
        }
    }

    /// Run seeding, the transfer storm and reconciliation in order.
    pub async fn run(&mut self) -> Reconciliation {
        let accounts = self.seed().await;
        let transfers = self.storm(&accounts).await;
        self.reconcile(accounts, transfers).await
    }

    /// Create N accounts at balance M.
    ///
    /// Each `Put` is retried until the service accepts it.
    pub async fn seed(&mut self) -> Vec<AccountId> {
        let accounts: Vec<AccountId> = (0..self.params.accounts)
            .map(|_| AccountId::random(&mut self.rng))
            .collect();

        for account in &accounts {
            while !matches!(
                self.client.put(account, self.params.initial_balance).await,
                Ok(true)
            ) {}
        }

        info!(
            "seeded {} accounts with {} each",
            accounts.len(),
            self.params.initial_balance
        );
        accounts
    }

    /// Issue T random transfers between `accounts`, once each.
    pub async fn storm(&mut self, accounts: &[AccountId]) -> TransferStats {
        let mut stats = TransferStats::default();
        if accounts.is_empty() {
            return stats;
        }

        let max_amount = self.params.max_amount.max(1);
        let progress_every = self.params.progress_every.max(1);

        for t in 0..self.params.transfers {
            let from = &accounts[self.rng.gen_range(0..accounts.len())];
            let to = &accounts[self.rng.gen_range(0..accounts.len())];
            let amount = self.rng.gen_range(1..=max_amount);

            stats.attempted += 1;
            match self.client.transfer(from, to, amount).await {
                Ok(true) => stats.applied += 1,
                Ok(false) => stats.declined += 1,
                // Abandoned: outcome unknown to the client.
                Err(_) => stats.failed += 1,
            }

            if t % progress_every == 0 {
                info!("transfer {}/{}", t, self.params.transfers);
            }
        }

        info!(
            "transfer storm done: {} applied, {} declined, {} failed",
            stats.applied, stats.declined, stats.failed
        );
        stats
    }

    /// Read every balance back and sum them.
    ///
    /// Each `Get` is retried until it succeeds. One `LogLength` call follows
    /// for diagnostics; its failure is not retried.
    pub async fn reconcile(
        &self,
        accounts: Vec<AccountId>,
        transfers: TransferStats,
    ) -> Reconciliation {
        let mut observed: i64 = 0;
        for account in &accounts {
            let balance = loop {
                if let Ok(balance) = self.client.get(account).await {
                    break balance;
                }
            };
            observed += i64::from(balance);
        }

        let log_length = match self.client.log_length().await {
            Ok(length) => Some(length),
            Err(e) => {
                warn!("log length unavailable: {}", e);
                None
            }
        };

        let expected = self.params.expected_total();
        info!("{} (expected: {})", observed, expected);

        Reconciliation {
            observed,
            expected,
            accounts,
            transfers,
            log_length,
        }
    }
}

//! Assertion helpers for chaos runs.
//!
//! These are pure functions that check a finished run. They take the
//! reconciliation as input and return pass/fail; the harness decides what
//! to do with a failure.

use crate::workload::{Reconciliation, TransferStats};

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// Assert that the sum of all balances equals `N * M`.
///
/// Transfers only move money, so any difference means a transfer was
/// partially applied, applied twice, or a seed was lost.
pub fn assert_conservation(reconciliation: &Reconciliation) -> AssertionResult {
    if reconciliation.is_conserved() {
        return AssertionResult::pass(&format!(
            "Total balance {} conserved across {} accounts",
            reconciliation.observed,
            reconciliation.accounts.len()
        ));
    }

    let drift = reconciliation.observed - reconciliation.expected;
    AssertionResult::fail(
        "Total balance conservation",
        &format!(
            "observed {} but expected {} (drift {:+}); {} transfers had unknown outcome",
            reconciliation.observed,
            reconciliation.expected,
            drift,
            reconciliation.transfers.failed
        ),
    )
}

/// Assert that every issued transfer was tallied exactly once.
pub fn assert_transfers_accounted(stats: &TransferStats) -> AssertionResult {
    let tallied = stats.applied + stats.declined + stats.failed;
    if tallied == stats.attempted {
        AssertionResult::pass(&format!("All {} transfers accounted for", stats.attempted))
    } else {
        AssertionResult::fail(
            "Transfer accounting",
            &format!(
                "{} attempted but {} applied + {} declined + {} failed",
                stats.attempted, stats.applied, stats.declined, stats.failed
            ),
        )
    }
}

//! Error types for ledger-chaos.

use crate::injector::InjectorError;

/// Main error type for harness runs.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The chaos injector hit a fatal process-control failure.
    #[error("chaos injector failed: {0}")]
    Injector(#[from] InjectorError),

    /// The chaos injector returned while it was still supposed to run.
    #[error("chaos injector exited before the workload finished")]
    InjectorExited,

    /// The chaos injector task panicked or was cancelled.
    #[error("chaos injector task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

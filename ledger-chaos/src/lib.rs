//! # ledger-chaos
//!
//! Crash/restart chaos harness for the blockdb ledger service.
//!
//! Two tasks run side by side:
//! - the chaos injector starts the service, lets it run for a fixed dwell
//!   window, kills it, and repeats
//! - the workload driver seeds N accounts at balance M, fires T random
//!   transfers through the connection-per-call client, then reads every
//!   balance back and compares the sum with `N * M`
//!
//! The harness only ever talks to the service over RPC.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod injector;
pub mod process;
pub mod signal;
pub mod workload;

pub use coordinator::{Coordinator, RunReport};
pub use error::HarnessError;
pub use signal::{RunState, StopSignal};
pub use workload::{Reconciliation, TransferStats, WorkloadDriver, WorkloadParams};

//! Coordinator: runs the workload alongside the chaos injector.
//!
//! The injector is spawned as its own task with a clone of the stop signal.
//! The workload runs on the caller's task. Once reconciliation is done the
//! signal is set and the coordinator waits for the injector to return, so
//! the harness never exits in the middle of a chaos cycle.

use std::time::Duration;
use tracing::{error, info};

use ledger_client::{LedgerClient, Transport};

use crate::error::{HarnessError, Result};
use crate::injector::ChaosInjector;
use crate::process::ProcessControl;
use crate::signal::StopSignal;
use crate::workload::{Reconciliation, WorkloadDriver, WorkloadParams};

/// Outcome of a full chaos run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Final balance check.
    pub reconciliation: Reconciliation,
    /// Chaos cycles completed while the workload ran.
    pub cycles: u64,
}

/// Owns the stop signal and the join on the chaos injector.
pub struct Coordinator<P: ProcessControl + 'static> {
    control: P,
    dwell: Duration,
    stop: StopSignal,
}

impl<P: ProcessControl + 'static> Coordinator<P> {
    /// Create a coordinator for one run.
    pub fn new(control: P, dwell: Duration) -> Self {
        Self {
            control,
            dwell,
            stop: StopSignal::new(),
        }
    }

    /// Handle on the stop signal, for observation.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the workload under chaos and reconcile.
    ///
    /// A fatal injector failure while the workload is running aborts the
    /// workload and is returned immediately.
    pub async fn run<T: Transport>(
        self,
        client: &LedgerClient<T>,
        params: WorkloadParams,
    ) -> Result<RunReport> {
        let Coordinator {
            control,
            dwell,
            stop,
        } = self;

        let injector = ChaosInjector::new(control, dwell, stop.clone());
        let mut handle = tokio::spawn(injector.run());

        let mut driver = WorkloadDriver::new(client, params);
        let reconciliation = tokio::select! {
            reconciliation = driver.run() => reconciliation,
            joined = &mut handle => {
                let err = match joined {
                    Ok(Err(e)) => HarnessError::Injector(e),
                    Ok(Ok(_)) => HarnessError::InjectorExited,
                    Err(e) => HarnessError::Join(e),
                };
                error!("{}", err);
                return Err(err);
            }
        };

        stop.stop();
        info!("workload finished, waiting for chaos injector");
        let report = handle.await??;

        Ok(RunReport {
            reconciliation,
            cycles: report.cycles,
        })
    }
}

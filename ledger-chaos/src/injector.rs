//! Chaos injector: start the service, let it run, kill it, repeat.
//!
//! ```text
//! Idle ──► Starting ──► Dwelling ──► Killing ──┐
//!  ▲                                           │
//!  └──────────── while stop signal = Running ──┘
//! ```
//!
//! The stop signal is only consulted between cycles, so a stop request lets
//! the current cycle finish and the service is never left running.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::process::{ProcessControl, ProcessError, ProcessId};
use crate::signal::StopSignal;

/// Fatal injector failures. Either one ends the whole harness.
#[derive(Debug, Error)]
pub enum InjectorError {
    /// The service could not be launched.
    #[error("cannot start the server: {0}")]
    Start(#[source] ProcessError),

    /// The service could not be killed.
    #[error("cannot kill the server {pid}: {source}")]
    Kill {
        /// Process that survived.
        pid: ProcessId,
        /// Underlying failure.
        #[source]
        source: ProcessError,
    },
}

/// Phase of the current chaos cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorPhase {
    /// Between cycles.
    Idle,
    /// Launching the service.
    Starting,
    /// Service is up and serving traffic.
    Dwelling,
    /// Terminating the service.
    Killing,
}

/// Summary of a finished injector run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Completed start/dwell/kill cycles.
    pub cycles: u64,
}

/// Repeatedly starts and kills the service until told to stop.
///
/// Owns the process control exclusively; the workload never sees it.
pub struct ChaosInjector<P: ProcessControl> {
    control: P,
    dwell: Duration,
    stop: StopSignal,
}

impl<P: ProcessControl> ChaosInjector<P> {
    /// Create an injector that keeps the service up for `dwell` per cycle.
    pub fn new(control: P, dwell: Duration, stop: StopSignal) -> Self {
        Self {
            control,
            dwell,
            stop,
        }
    }

    /// Cycle until the stop signal reads `Stopping`.
    pub async fn run(self) -> Result<CycleReport, InjectorError> {
        let mut report = CycleReport::default();

        while !self.stop.is_stopping() {
            debug!(phase = ?InjectorPhase::Starting, cycle = report.cycles + 1);
            info!("start");
            let pid = self.control.start().await.map_err(InjectorError::Start)?;

            debug!(phase = ?InjectorPhase::Dwelling, %pid);
            tokio::time::sleep(self.dwell).await;

            debug!(phase = ?InjectorPhase::Killing, %pid);
            info!("kill {}", pid);
            if let Err(source) = self.control.terminate(&pid).await {
                return Err(InjectorError::Kill { pid, source });
            }

            report.cycles += 1;
            debug!(phase = ?InjectorPhase::Idle, cycles = report.cycles);
        }

        info!("chaos injector stopped after {} cycles", report.cycles);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockProcessControl, ProcessEvent};

    #[tokio::test]
    async fn stopped_before_start_runs_no_cycle() {
        let control = MockProcessControl::new();
        let stop = StopSignal::new();
        stop.stop();

        let report = ChaosInjector::new(control.clone(), Duration::from_millis(1), stop)
            .run()
            .await
            .unwrap();

        assert_eq!(report.cycles, 0);
        assert_eq!(control.starts(), 0);
    }

    #[tokio::test]
    async fn cycles_until_stopped_and_finishes_last_cycle() {
        let control = MockProcessControl::new();
        let stop = StopSignal::new();
        let handle = tokio::spawn(
            ChaosInjector::new(control.clone(), Duration::from_millis(10), stop.clone()).run(),
        );

        while control.kills() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stop.stop();
        let report = handle.await.unwrap().unwrap();

        assert!(report.cycles >= 3);
        assert_eq!(control.starts(), control.kills());
        let events = control.events();
        assert_eq!(events.len() as u64, report.cycles * 2);
        for pair in events.chunks(2) {
            match pair {
                [ProcessEvent::Started(a), ProcessEvent::Killed(b)] => assert_eq!(a, b),
                other => panic!("unbalanced cycle: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn start_failure_is_fatal() {
        let control = MockProcessControl::new();
        control.fail_start_at(2);

        let result = ChaosInjector::new(control.clone(), Duration::from_millis(1), StopSignal::new())
            .run()
            .await;

        assert!(matches!(result, Err(InjectorError::Start(_))));
        assert_eq!(control.starts(), 2);
        assert_eq!(control.kills(), 1);
    }

    #[tokio::test]
    async fn kill_failure_is_fatal() {
        let control = MockProcessControl::new();
        control.fail_kill_at(1);

        let result = ChaosInjector::new(control.clone(), Duration::from_millis(1), StopSignal::new())
            .run()
            .await;

        match result {
            Err(InjectorError::Kill { pid, .. }) => assert_eq!(pid, ProcessId::new("1001")),
            other => panic!("expected kill failure, got {other:?}"),
        }
        assert_eq!(control.starts(), 1);
    }
}

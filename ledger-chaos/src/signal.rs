//! One-way stop signal shared by the workload driver and the chaos injector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observable state of a [`StopSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The injector should keep cycling.
    Running,
    /// The injector should finish its current cycle and return.
    Stopping,
}

/// Single-writer, multi-reader stop flag.
///
/// The only transition is `Running → Stopping`. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopping: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal in the `Running` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `Stopping`. Calling it again has no effect.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        if self.is_stopping() {
            RunState::Stopping
        } else {
            RunState::Running
        }
    }

    /// Whether `stop()` has been called.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }
}

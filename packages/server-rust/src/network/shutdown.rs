//! Serving lifecycle with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free state transitions and an atomic counter with
//! RAII guards so draining can wait for dispatched requests to finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Serving state of the process.
///
/// State machine: Starting -> Serving -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeState {
    /// Listener not yet accepting requests.
    Starting,
    /// Accepting and dispatching requests.
    Serving,
    /// Shutdown signalled; waiting for in-flight requests.
    Draining,
    /// Every in-flight request has completed.
    Stopped,
}

impl ServeState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Tracks serving state and the number of requests being dispatched.
#[derive(Debug)]
pub struct ShutdownController {
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<ServeState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(ServeState::Starting),
        }
    }

    pub fn set_serving(&self) {
        self.state.store(Arc::new(ServeState::Serving));
    }

    /// Moves to `Draining`.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(ServeState::Draining));
    }

    #[must_use]
    pub fn state(&self) -> ServeState {
        **self.state.load()
    }

    /// Counts a request as in flight until the returned guard is dropped.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits up to `timeout` for in-flight requests to reach zero.
    ///
    /// Returns `true` and moves to `Stopped` on success; on timeout returns
    /// `false` and stays `Draining`.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.state.store(Arc::new(ServeState::Stopped));
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

//! Single-flight store initialization gate.
//!
//! The gate owns the store lifecycle state machine:
//!
//! ```text
//! Idle --ensure_ready--> Attempting --ok--> Ready (terminal)
//!   ^                        |
//!   +---------err------------+
//! ```
//!
//! A failed attempt returns the gate to `Idle` so the next caller starts a
//! fresh attempt. There is no backoff, no attempt limit and no timeout around
//! the initializer: a hung initializer hangs every caller waiting on it.
//!
//! Each attempt runs on its own spawned task and is observed through a
//! [`Shared`] future, so every concurrent caller receives the same outcome and
//! the attempt still completes if all of its callers are cancelled.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, info};
use vaultgate_core::UNKNOWN_INIT_ERROR;

use crate::telemetry::{STORE_INIT_ATTEMPTS, STORE_INIT_FAILURES};
use crate::traits::{PlatformEnv, StoreInitializer};

/// Failure of a single initialization attempt, shared by every caller that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InitFailure {
    message: Arc<str>,
}

impl InitFailure {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The initializer's failure message, verbatim.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of [`InitializationGate::ensure_ready`].
pub type InitOutcome = Result<(), InitFailure>;

type AttemptFuture = Shared<BoxFuture<'static, InitOutcome>>;

enum Phase {
    Idle,
    Attempting {
        generation: u64,
        attempt: AttemptFuture,
    },
    Ready,
}

struct GateState {
    phase: Phase,
    /// Outcome of the most recently completed attempt, if it failed.
    last_error: Option<Arc<str>>,
    /// Number of attempts started so far.
    generation: u64,
}

/// Point-in-time view of the gate, for logging and health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// No attempt in flight. `last_error` is set if the last attempt failed.
    Idle { last_error: Option<String> },
    /// An attempt is running.
    Attempting { generation: u64 },
    /// The store is initialized for the remainder of the process.
    Ready,
}

/// Coordinates concurrent callers around one store initializer.
///
/// Construct one per process in the composition root and share it via `Arc`.
pub struct InitializationGate {
    initializer: Arc<dyn StoreInitializer>,
    state: Arc<Mutex<GateState>>,
}

impl InitializationGate {
    /// Creates a gate in the `Idle` state. The initializer is not called
    /// until the first [`ensure_ready`](Self::ensure_ready).
    #[must_use]
    pub fn new(initializer: Arc<dyn StoreInitializer>) -> Self {
        Self {
            initializer,
            state: Arc::new(Mutex::new(GateState {
                phase: Phase::Idle,
                last_error: None,
                generation: 0,
            })),
        }
    }

    /// Ensures the store is initialized.
    ///
    /// - Ready: returns `Ok(())` without suspending.
    /// - Attempt in flight: waits for it and returns its outcome.
    /// - Otherwise: starts a new attempt and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the [`InitFailure`] of the attempt this call waited on.
    pub async fn ensure_ready(&self, env: &PlatformEnv) -> InitOutcome {
        let attempt = {
            let mut state = self.state.lock();
            match &state.phase {
                Phase::Ready => return Ok(()),
                Phase::Attempting {
                    generation,
                    attempt,
                } => {
                    debug!(generation, "Joining in-flight store initialization");
                    attempt.clone()
                }
                Phase::Idle => {
                    state.generation += 1;
                    let generation = state.generation;
                    let attempt = self.launch(generation, env.clone());
                    state.phase = Phase::Attempting {
                        generation,
                        attempt: attempt.clone(),
                    };
                    attempt
                }
            }
        };

        attempt.await
    }

    /// Spawns attempt `generation` and returns a future every caller can await.
    ///
    /// Called with the state lock held, so the spawned task cannot complete
    /// the transition before `Attempting` is recorded.
    fn launch(&self, generation: u64, env: PlatformEnv) -> AttemptFuture {
        let initializer = Arc::clone(&self.initializer);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            metrics::counter!(STORE_INIT_ATTEMPTS).increment(1);
            info!(generation, "Initializing store");

            let outcome = match AssertUnwindSafe(initializer.initialize(&env))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(InitFailure::new(e.to_string())),
                Err(_panic) => Err(InitFailure::new(UNKNOWN_INIT_ERROR)),
            };
            complete(&state, generation, &outcome);
            outcome
        });

        let state = Arc::clone(&self.state);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                // Only reachable if the runtime shuts down mid-attempt.
                Err(join_err) => {
                    let outcome = Err(InitFailure::new(join_err.to_string()));
                    complete(&state, generation, &outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Returns `true` once an attempt has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Ready)
    }

    /// Failure message of the most recently completed attempt.
    ///
    /// Not meaningful while an attempt is in flight.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.as_deref().map(str::to_string)
    }

    #[must_use]
    pub fn status(&self) -> GateStatus {
        let state = self.state.lock();
        match &state.phase {
            Phase::Idle => GateStatus::Idle {
                last_error: state.last_error.as_deref().map(str::to_string),
            },
            Phase::Attempting { generation, .. } => GateStatus::Attempting {
                generation: *generation,
            },
            Phase::Ready => GateStatus::Ready,
        }
    }
}

/// Records the outcome of attempt `generation` and releases its handle.
///
/// No-op unless that attempt is the one currently in flight.
fn complete(state: &Mutex<GateState>, generation: u64, outcome: &InitOutcome) {
    let mut state = state.lock();
    match state.phase {
        Phase::Attempting { generation: g, .. } if g == generation => {}
        _ => return,
    }

    match outcome {
        Ok(()) => {
            state.phase = Phase::Ready;
            state.last_error = None;
            info!(generation, "Store initialized");
        }
        Err(failure) => {
            state.phase = Phase::Idle;
            state.last_error = Some(Arc::clone(&failure.message));
            metrics::counter!(STORE_INIT_FAILURES).increment(1);
            error!(generation, error = %failure, "Failed to initialize store");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::future::join_all;
    use tokio::sync::Notify;

    use super::*;
    use crate::traits::InitError;

    /// Initializer that replays scripted outcomes, then succeeds.
    #[derive(Default)]
    pub(crate) struct ScriptedInitializer {
        calls: AtomicUsize,
        delay: Duration,
        script: parking_lot::Mutex<VecDeque<Result<(), String>>>,
    }

    impl ScriptedInitializer {
        pub(crate) fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        pub(crate) fn failing_once(message: &str) -> Self {
            let init = Self::default();
            init.script.lock().push_back(Err(message.to_string()));
            init
        }

        pub(crate) fn push(&self, outcome: Result<(), String>) {
            self.script.lock().push_back(outcome);
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreInitializer for ScriptedInitializer {
        async fn initialize(&self, _env: &PlatformEnv) -> Result<(), InitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.script.lock().pop_front() {
                Some(Err(message)) => Err(InitError::Message(message)),
                Some(Ok(())) | None => Ok(()),
            }
        }
    }

    /// Initializer that blocks until released.
    #[derive(Default)]
    struct BlockingInitializer {
        calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl StoreInitializer for BlockingInitializer {
        async fn initialize(&self, _env: &PlatformEnv) -> Result<(), InitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(())
        }
    }

    struct PanickingInitializer;

    #[async_trait]
    impl StoreInitializer for PanickingInitializer {
        async fn initialize(&self, _env: &PlatformEnv) -> Result<(), InitError> {
            panic!("initializer exploded");
        }
    }

    fn gate_with(init: &Arc<ScriptedInitializer>) -> InitializationGate {
        InitializationGate::new(Arc::clone(init) as Arc<dyn StoreInitializer>)
    }

    #[test]
    fn new_gate_is_idle_without_error() {
        let gate = gate_with(&Arc::new(ScriptedInitializer::default()));
        assert_eq!(gate.status(), GateStatus::Idle { last_error: None });
        assert!(!gate.is_ready());
        assert!(gate.last_error().is_none());
    }

    #[tokio::test]
    async fn success_is_sticky_and_never_reinitializes() {
        let init = Arc::new(ScriptedInitializer::default());
        let gate = gate_with(&init);
        let env = PlatformEnv::default();

        assert_eq!(gate.ensure_ready(&env).await, Ok(()));
        assert!(gate.is_ready());
        assert_eq!(gate.status(), GateStatus::Ready);

        for _ in 0..5 {
            assert_eq!(gate.ensure_ready(&env).await, Ok(()));
        }
        assert_eq!(init.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_attempt() {
        let init = Arc::new(ScriptedInitializer::with_delay(Duration::from_millis(100)));
        let gate = gate_with(&init);
        let env = PlatformEnv::default();

        let outcomes = join_all((0..16).map(|_| gate.ensure_ready(&env))).await;

        assert_eq!(init.calls(), 1);
        assert!(outcomes.iter().all(Result::is_ok));
        assert!(gate.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_failure() {
        let init = Arc::new(ScriptedInitializer::with_delay(Duration::from_millis(100)));
        init.push(Err("disk full".to_string()));
        let gate = gate_with(&init);
        let env = PlatformEnv::default();

        let outcomes = join_all((0..8).map(|_| gate.ensure_ready(&env))).await;

        assert_eq!(init.calls(), 1);
        for outcome in outcomes {
            assert_eq!(outcome.unwrap_err().message(), "disk full");
        }
        assert_eq!(
            gate.status(),
            GateStatus::Idle {
                last_error: Some("disk full".to_string())
            }
        );
    }

    #[tokio::test]
    async fn failure_is_retried_on_next_call() {
        let init = Arc::new(ScriptedInitializer::failing_once("disk full"));
        let gate = gate_with(&init);
        let env = PlatformEnv::default();

        let err = gate.ensure_ready(&env).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(gate.last_error().as_deref(), Some("disk full"));
        assert!(!gate.is_ready());

        assert_eq!(gate.ensure_ready(&env).await, Ok(()));
        assert_eq!(init.calls(), 2);
        assert!(gate.is_ready());
        assert!(gate.last_error().is_none());
    }

    #[tokio::test]
    async fn repeated_failures_each_start_a_new_attempt() {
        let init = Arc::new(ScriptedInitializer::default());
        for i in 0..3 {
            init.push(Err(format!("attempt {i} failed")));
        }
        let gate = gate_with(&init);
        let env = PlatformEnv::default();

        for i in 0..3 {
            let err = gate.ensure_ready(&env).await.unwrap_err();
            assert_eq!(err.message(), format!("attempt {i} failed"));
        }
        assert_eq!(gate.ensure_ready(&env).await, Ok(()));
        assert_eq!(init.calls(), 4);
    }

    #[tokio::test]
    async fn panicking_initializer_reports_unknown_error_and_recovers() {
        let gate = InitializationGate::new(Arc::new(PanickingInitializer));
        let env = PlatformEnv::default();

        let err = gate.ensure_ready(&env).await.unwrap_err();
        assert_eq!(err.message(), UNKNOWN_INIT_ERROR);
        assert_eq!(
            gate.status(),
            GateStatus::Idle {
                last_error: Some(UNKNOWN_INIT_ERROR.to_string())
            }
        );

        // The in-flight handle was released, so the next call tries again.
        let err = gate.ensure_ready(&env).await.unwrap_err();
        assert_eq!(err.message(), UNKNOWN_INIT_ERROR);
    }

    #[tokio::test]
    async fn attempt_survives_cancelled_callers() {
        let init = Arc::new(BlockingInitializer::default());
        let gate = Arc::new(InitializationGate::new(
            Arc::clone(&init) as Arc<dyn StoreInitializer>
        ));

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.ensure_ready(&PlatformEnv::default()).await })
        };
        while init.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(matches!(gate.status(), GateStatus::Attempting { generation: 1 }));

        waiter.abort();
        let _ = waiter.await;
        init.release.notify_one();

        assert_eq!(gate.ensure_ready(&PlatformEnv::default()).await, Ok(()));
        assert_eq!(init.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_completion_is_ignored() {
        let gate = gate_with(&Arc::new(ScriptedInitializer::default()));
        gate.ensure_ready(&PlatformEnv::default()).await.unwrap();

        complete(&gate.state, 99, &Err(InitFailure::new("late")));
        assert_eq!(gate.status(), GateStatus::Ready);
        assert!(gate.last_error().is_none());
    }
}

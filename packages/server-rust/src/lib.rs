//! `vaultgate` server — gates store-dependent requests on a single-flight
//! store initialization and serves everything else immediately.
//!
//! Composition, per request:
//! 1. [`PathClassifier`](vaultgate_core::PathClassifier) decides whether the
//!    request needs the store
//! 2. [`InitializationGate`] makes sure the store is initialized, sharing one
//!    in-flight attempt among concurrent callers
//! 3. [`RequestDispatcher`] routes, or answers with a 500 when initialization
//!    failed, and applies CORS headers to every response

pub mod dispatch;
pub mod gate;
pub mod network;
#[cfg(feature = "redb")]
pub mod storage;
pub mod telemetry;
pub mod traits;

pub use dispatch::RequestDispatcher;
pub use gate::{GateStatus, InitFailure, InitOutcome, InitializationGate};
pub use traits::{InitError, PlatformEnv, RequestRouter, StoreInitializer};

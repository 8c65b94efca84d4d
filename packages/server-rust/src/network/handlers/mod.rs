//! axum handlers for the `vaultgate` server.
//!
//! Every request enters through [`dispatch_handler`], installed as the
//! router fallback. [`builtin`] holds the minimal business router the
//! binary ships with.

pub mod builtin;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;

use super::ShutdownController;
use crate::dispatch::RequestDispatcher;
use crate::traits::PlatformEnv;

pub use builtin::builtin_router;

/// Shared application state passed to handlers via `State` extraction.
///
/// Holds `Arc` references so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    /// Platform bindings handed to the initializer and router.
    pub env: PlatformEnv,
    /// In-flight tracking for graceful drain.
    pub shutdown: Arc<ShutdownController>,
}

/// Hands the request to the dispatcher, counting it as in flight.
pub async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let _guard = state.shutdown.in_flight_guard();
    state.dispatcher.handle(request, &state.env).await
}

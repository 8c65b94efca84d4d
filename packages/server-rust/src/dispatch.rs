//! Per-request orchestration: classify, gate, route, wrap.

use std::sync::Arc;

use axum::body::Body;
use http::header::ORIGIN;
use http::{Request, Response};
use tracing::debug;
use vaultgate_core::PathClassifier;

use crate::gate::InitializationGate;
use crate::network::cors::{apply_cors, CorsPolicy};
use crate::network::response::store_unavailable_response;
use crate::telemetry::REQUESTS;
use crate::traits::{PlatformEnv, RequestRouter};

/// Routes every request through the store gate when it needs the store.
///
/// Requests the classifier skips never touch the gate, so static, config and
/// notification traffic keeps flowing while the store is down or initializing.
pub struct RequestDispatcher {
    classifier: PathClassifier,
    gate: Arc<InitializationGate>,
    router: Arc<dyn RequestRouter>,
    cors: CorsPolicy,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(
        gate: Arc<InitializationGate>,
        router: Arc<dyn RequestRouter>,
        cors: CorsPolicy,
    ) -> Self {
        Self {
            classifier: PathClassifier::new(),
            gate,
            router,
            cors,
        }
    }

    /// Replaces the built-in classification table.
    #[must_use]
    pub fn with_classifier(mut self, classifier: PathClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Shared reference to the gate, for health checks and logging.
    #[must_use]
    pub fn gate(&self) -> Arc<InitializationGate> {
        Arc::clone(&self.gate)
    }

    /// Handles one request and returns the CORS-wrapped response.
    ///
    /// Never fails: a store initialization failure becomes a 500 response
    /// and the router is not called.
    pub async fn handle(&self, request: Request<Body>, env: &PlatformEnv) -> Response<Body> {
        let origin = request.headers().get(ORIGIN).cloned();
        let response = self.dispatch(request, env).await;
        apply_cors(&self.cors, origin.as_ref(), response)
    }

    async fn dispatch(&self, request: Request<Body>, env: &PlatformEnv) -> Response<Body> {
        let required = self
            .classifier
            .requires_store(request.method().as_str(), request.uri().path());
        metrics::counter!(REQUESTS, "store" => if required { "required" } else { "skipped" })
            .increment(1);

        if required {
            if let Err(failure) = self.gate.ensure_ready(env).await {
                debug!(
                    method = %request.method(),
                    path = request.uri().path(),
                    "Rejecting request: store not initialized"
                );
                return store_unavailable_response(&failure);
            }
        }

        self.router.route(request, env).await
    }
}

//! Network module with deferred startup lifecycle.
//!
//! `new()` wires shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Binding before serving lets
//! callers learn the OS-assigned port first.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{dispatch_handler, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::dispatch::RequestDispatcher;
use crate::traits::PlatformEnv;

/// Manages the HTTP server lifecycle around a [`RequestDispatcher`].
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatcher: Arc<RequestDispatcher>,
    env: PlatformEnv,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, dispatcher: Arc<RequestDispatcher>, env: PlatformEnv) -> Self {
        Self {
            config,
            listener: None,
            dispatcher,
            env,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router.
    ///
    /// There are no explicit routes: every request goes to the dispatcher
    /// through the fallback, wrapped in the transport middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            env: self.env.clone(),
            shutdown: Arc::clone(&self.shutdown),
        };

        Router::new()
            .fallback(dispatch_handler)
            .layer(build_http_layers())
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// Once the signal fires, in-flight requests get `drain_timeout` to
    /// finish. Past that deadline `serve` returns anyway, abandoning requests
    /// still waiting (for example on a hung store initializer).
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called or the server hits a
    /// fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let controller = self.shutdown;
        let drain_timeout = self.config.drain_timeout;

        let (fired_tx, fired_rx) = oneshot::channel();
        let signal = {
            let controller = Arc::clone(&controller);
            async move {
                shutdown.await;
                controller.trigger_shutdown();
                let _ = fired_tx.send(());
            }
        };

        controller.set_serving();
        info!("Serving HTTP connections");

        let server = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .into_future();

        tokio::select! {
            result = server => {
                result?;
                controller.wait_for_drain(drain_timeout).await;
                info!("All in-flight requests drained");
            }
            () = drain_deadline(fired_rx, drain_timeout) => {
                warn!(
                    in_flight = controller.in_flight_count(),
                    "Drain timeout expired with in-flight requests remaining"
                );
            }
        }
        Ok(())
    }
}

/// Resolves `timeout` after the shutdown signal fires; never if it doesn't.
async fn drain_deadline(fired: oneshot::Receiver<()>, timeout: Duration) {
    if fired.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(timeout).await;
}

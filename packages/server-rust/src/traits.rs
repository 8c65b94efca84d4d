use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use http::{Request, Response};
use tower::ServiceExt;

/// Opaque bundle of platform bindings (credentials, names, flags) passed
/// unchanged to the store initializer and the request router.
///
/// Cloning is cheap: the bindings are shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct PlatformEnv {
    bindings: Arc<HashMap<String, String>>,
}

impl PlatformEnv {
    /// Creates an environment from `(name, value)` pairs. Later pairs win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let bindings = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            bindings: Arc::new(bindings),
        }
    }

    /// Looks up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Parses a `NAME=VALUE` binding, splitting on the first `=`.
///
/// # Errors
///
/// Returns a message if there is no `=` or the name is empty.
pub fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

/// Errors a store initializer may report.
///
/// Only the `Display` text reaches clients; it is surfaced verbatim.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("{0}")]
    Message(String),
    #[error("stored schema version {found} does not match expected version {expected}")]
    SchemaMismatch { found: u32, expected: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "redb")]
    #[error(transparent)]
    Redb(#[from] redb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Creates or verifies the persistent structures the router depends on.
///
/// Implementations must be idempotent: the gate may call `initialize` again
/// after a failed attempt.
#[async_trait]
pub trait StoreInitializer: Send + Sync {
    async fn initialize(&self, env: &PlatformEnv) -> Result<(), InitError>;
}

/// Business request handler invoked once the store is ready (or not needed).
///
/// Router-level failures are expressed as responses, never as errors.
#[async_trait]
pub trait RequestRouter: Send + Sync {
    async fn route(&self, request: Request<Body>, env: &PlatformEnv) -> Response<Body>;
}

/// Any axum router can serve as the business router. The environment is
/// made available to handlers as an `Extension<PlatformEnv>`.
#[async_trait]
impl RequestRouter for axum::Router {
    async fn route(&self, mut request: Request<Body>, env: &PlatformEnv) -> Response<Body> {
        request.extensions_mut().insert(env.clone());
        match self.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

//! Transport-level HTTP middleware.
//!
//! Layers listed first are outermost. CORS is not a layer here: the
//! dispatcher applies it to every response it produces.

use axum::http::header::HeaderName;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// The composed layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        CompressionLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Stack<SetRequestIdLayer<MakeRequestUuid>, tower::layer::util::Identity>,
        >,
    >,
>;

/// Builds the transport middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id`
/// 2. `Tracing` -- request/response spans
/// 3. `Compression` -- gzip
/// 4. `PropagateRequestId` -- copies `X-Request-Id` onto the response
///
/// No timeout layer: a request waiting on a hung store initializer waits
/// as long as the initializer does.
#[must_use]
pub fn build_http_layers() -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

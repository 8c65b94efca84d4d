//! JSON response helpers.

use axum::body::Body;
use axum::response::IntoResponse;
use axum::Json;
use http::{Response, StatusCode};
use serde::Serialize;
use vaultgate_core::ErrorEnvelope;

use crate::gate::InitFailure;

/// Serializes `payload` as a JSON response with the given status.
pub fn json_response<T: Serialize>(payload: &T, status: StatusCode) -> Response<Body> {
    (status, Json(payload)).into_response()
}

/// The fixed 500 response for requests that need a store that failed to
/// initialize.
#[must_use]
pub fn store_unavailable_response(failure: &InitFailure) -> Response<Body> {
    json_response(
        &ErrorEnvelope::store_not_initialized(failure.message()),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

//! Cross-origin response headers.
//!
//! Applied by the dispatcher to every outgoing response, including
//! synthesized error responses and pre-flight replies from the router.

use axum::body::Body;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, VARY,
};
use http::{HeaderValue, Response};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
const ALLOW_HEADERS: &str =
    "Authorization, Content-Type, Accept, Device-Type, Bitwarden-Client-Name, Bitwarden-Client-Version";
const MAX_AGE_SECS: &str = "86400";

/// Which origins may read responses.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: Vec<HeaderValue>,
}

impl CorsPolicy {
    /// Builds a policy from configured origins.
    ///
    /// A wildcard `"*"` allows any origin. Otherwise each entry is parsed into
    /// an explicit allowlist; unparseable entries are dropped.
    #[must_use]
    pub fn from_origins(origins: &[String]) -> Self {
        if origins.iter().any(|o| o == "*") {
            return Self::any();
        }
        Self {
            allow_any: false,
            origins: origins.iter().filter_map(|o| o.parse().ok()).collect(),
        }
    }

    #[must_use]
    pub fn any() -> Self {
        Self {
            allow_any: true,
            origins: Vec::new(),
        }
    }

    /// Value for `Access-Control-Allow-Origin`, or `None` if the request's
    /// origin is not allowed.
    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.allow_any {
            return Some(HeaderValue::from_static("*"));
        }
        origin.filter(|o| self.origins.contains(o)).cloned()
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::any()
    }
}

/// Adds CORS headers to `response` for a request carrying `origin`.
///
/// An allow-list policy always adds `Vary: Origin`, even for a rejected
/// origin, so shared caches key on it. Otherwise a disallowed origin gets no
/// CORS headers. Headers the router already set are overwritten.
#[must_use]
pub fn apply_cors(
    policy: &CorsPolicy,
    origin: Option<&HeaderValue>,
    mut response: Response<Body>,
) -> Response<Body> {
    if !policy.allow_any {
        response
            .headers_mut()
            .append(VARY, HeaderValue::from_static("Origin"));
    }
    let Some(allow_origin) = policy.allow_origin(origin) else {
        return response;
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
    response
}

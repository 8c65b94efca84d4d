//! Minimal business router served by the `vaultgate` binary.
//!
//! Covers the informational endpoints, static stubs, and CORS pre-flight;
//! anything else is a JSON 404. Real deployments supply their own
//! [`RequestRouter`].
//!
//! [`RequestRouter`]: crate::traits::RequestRouter

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use crate::traits::PlatformEnv;

/// Binding read by the config endpoints to report the public URL.
pub const DOMAIN_BINDING: &str = "DOMAIN";

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[must_use]
pub fn builtin_router() -> Router {
    Router::new()
        .route("/api/version", get(version_handler))
        .route("/api/config", get(config_handler))
        .route("/config", get(config_handler))
        .route("/favicon.ico", get(no_content))
        .route("/favicon.svg", get(no_content))
        .route(
            "/.well-known/appspecific/com.chrome.devtools.json",
            get(no_content),
        )
        .route("/icons/{*asset}", get(no_content))
        .route("/notifications/{*hub}", any(no_content))
        .fallback(not_found)
        .layer(middleware::from_fn(answer_preflight))
}

/// Answers every `OPTIONS` request with an empty 204, whatever the path.
///
/// Browsers reject a pre-flight with a non-2xx status, and routes registered
/// for `GET` only would otherwise answer 405.
async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(request).await
}

async fn version_handler() -> Json<&'static str> {
    Json(VERSION)
}

async fn config_handler(Extension(env): Extension<PlatformEnv>) -> Json<Value> {
    let domain = env.get(DOMAIN_BINDING).unwrap_or_default();

    Json(json!({
        "version": VERSION,
        "environment": {
            "vault": domain,
            "api": format!("{domain}/api"),
            "identity": format!("{domain}/identity"),
            "notifications": format!("{domain}/notifications"),
        },
        "object": "config",
    }))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not_found", "error_description": "Not found" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;
    use crate::traits::RequestRouter;

    async fn get_json(path: &str, env: &PlatformEnv) -> (StatusCode, Value) {
        send(Method::GET, path, env).await
    }

    async fn send(method: Method, path: &str, env: &PlatformEnv) -> (StatusCode, Value) {
        let request = http::Request::builder()
            .method(method)
            .uri(path)
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();
        let response = RequestRouter::route(&builtin_router(), request, env).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn version_reports_package_version() {
        let (status, json) = get_json("/api/version", &PlatformEnv::default()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, VERSION);
    }

    #[tokio::test]
    async fn config_uses_domain_binding() {
        let env = PlatformEnv::from_pairs([(DOMAIN_BINDING, "https://vault.example.com")]);
        let (status, json) = get_json("/api/config", &env).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["environment"]["vault"], "https://vault.example.com");
        assert_eq!(
            json["environment"]["api"],
            "https://vault.example.com/api"
        );
    }

    #[tokio::test]
    async fn favicon_is_empty() {
        let (status, _) = get_json("/favicon.ico", &PlatformEnv::default()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let (status, json) = get_json("/api/items", &PlatformEnv::default()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn preflight_is_no_content_on_any_path() {
        let env = PlatformEnv::default();
        for path in ["/api/ciphers", "/api/version", "/identity/connect/token", "/"] {
            let (status, body) = send(Method::OPTIONS, path, &env).await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{path}");
            assert_eq!(body, Value::Null, "{path}");
        }
    }

    #[tokio::test]
    async fn gate_exempt_static_paths_are_served() {
        let env = PlatformEnv::default();
        for path in [
            "/favicon.svg",
            "/.well-known/appspecific/com.chrome.devtools.json",
            "/icons/example.com/icon.png",
            "/notifications/hub",
        ] {
            let (status, _) = get_json(path, &env).await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{path}");
        }

        let (status, _) = send(Method::POST, "/notifications/hub/negotiate", &env).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

//! HTTP serving: configuration, CORS, middleware, handlers, and lifecycle.

pub mod config;
pub mod cors;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod response;
pub mod shutdown;

pub use config::NetworkConfig;
pub use cors::{apply_cors, CorsPolicy};
pub use handlers::AppState;
pub use module::NetworkModule;
pub use response::{json_response, store_unavailable_response};
pub use shutdown::{InFlightGuard, ServeState, ShutdownController};

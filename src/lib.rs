use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod server;

use config::Config;
use http::{session::SessionStore, MCP_PATH, MESSAGES_PATH, SSE_PATH};
use registry::Registry;

/// Identity reported to clients in `initialize` and discovery.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub description: String,
}

impl From<&Config> for ServerInfo {
    fn from(config: &Config) -> Self {
        Self {
            name: config.server_name.clone(),
            description: config.server_description.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub server_info: Arc<ServerInfo>,
    pub api_token: Option<Arc<str>>,
    pub registry: Arc<Registry>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(server_info: ServerInfo, api_token: Option<String>, registry: Registry) -> Self {
        Self {
            server_info: Arc::new(server_info),
            api_token: api_token.map(Arc::<str>::from),
            registry: Arc::new(registry),
            sessions: SessionStore::new(),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(SSE_PATH, get(http::sse::sse_stream))
        .route(MESSAGES_PATH, post(http::sse::post_message))
        .route(MCP_PATH, post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

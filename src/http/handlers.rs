//! Axum HTTP handlers for the web server
//!
//! Provides the plain JSON-RPC Model Context Protocol endpoint, and general metadata endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::{MCP_PATH, MESSAGES_PATH, SSE_PATH};
use crate::mcp::server::handle_json_rpc_body;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: String,
    pub version: &'static str,
    pub description: String,
    pub mcp_endpoint: &'static str,
    pub sse_endpoint: &'static str,
    pub messages_endpoint: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: state.server_info.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        description: state.server_info.description.clone(),
        mcp_endpoint: MCP_PATH,
        sse_endpoint: SSE_PATH,
        messages_endpoint: MESSAGES_PATH,
    })
}

pub async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    match handle_json_rpc_body(&state, &body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

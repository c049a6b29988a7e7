//! Server-Sent Events transport
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL it
//! must POST its JSON-RPC messages to. Responses to those messages are pushed
//! back on the stream as `message` events.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tracing::info;

use crate::errors::AppError;
use crate::http::{session::SessionGuard, MESSAGES_PATH};
use crate::mcp::server::handle_json_rpc_body;
use crate::AppState;

pub const ENDPOINT_EVENT: &str = "endpoint";
pub const MESSAGE_EVENT: &str = "message";

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

pub fn endpoint_uri(session_id: &str) -> String {
    format!("{MESSAGES_PATH}?sessionId={session_id}")
}

pub async fn sse_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, receiver) = state.sessions.open();
    info!(session_id = %session_id, "sse client connected");

    let endpoint = Event::default()
        .event(ENDPOINT_EVENT)
        .data(endpoint_uri(&session_id));
    let guard = SessionGuard::new(state.sessions.clone(), session_id);

    let messages = ReceiverStream::new(receiver).map(move |message| {
        // moves the guard into the stream so the session closes with it
        let _session_id = guard.session_id();
        Ok::<_, Infallible>(Event::default().event(MESSAGE_EVENT).data(message.to_string()))
    });

    Sse::new(tokio_stream::once(Ok(endpoint)).chain(messages)).keep_alive(KeepAlive::default())
}

pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    // Unknown sessions are rejected before the message is dispatched.
    state.sessions.sender(&query.session_id)?;

    if let Some(response) = handle_json_rpc_body(&state, &body).await {
        state.sessions.deliver(&query.session_id, response)?;
    }

    Ok(StatusCode::ACCEPTED)
}

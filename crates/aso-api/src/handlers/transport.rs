//! HTTP transport for MCP: direct requests and SSE sessions

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// Path clients post to after opening an SSE stream
pub const SSE_MESSAGE_PATH: &str = "/sse/message";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// `POST /mcp`: answer a JSON-RPC request in the response body
pub async fn mcp_handler(State(state): State<Arc<AppState>>, body: String) -> Response {
    match state.mcp.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// `GET /sse`: open a session stream.
///
/// The first event tells the client where to post its requests; every later
/// `message` event carries one JSON-RPC response.
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, rx) = state.open_session().await;
    tracing::info!(session = %session_id, "SSE stream opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{SSE_MESSAGE_PATH}?sessionId={session_id}"));

    let messages = stream::unfold(rx, |mut rx| async move {
        let payload = rx.recv().await?;
        Some((Ok(Event::default().event("message").data(payload)), rx))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

/// `POST /sse/message?sessionId=`: dispatch and push the response onto the stream
pub async fn sse_message_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Result<StatusCode, AppError> {
    let session_id = query
        .session_id
        .ok_or_else(|| AppError::BadRequest("sessionId is required".to_string()))?;
    let sender = state
        .session(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    if let Some(response) = state.mcp.handle_message(&body).await {
        let payload =
            serde_json::to_string(&response).map_err(|e| AppError::Internal(e.to_string()))?;
        if sender.send(payload).await.is_err() {
            state.close_session(&session_id).await;
            return Err(AppError::SessionNotFound(session_id));
        }
    }

    Ok(StatusCode::ACCEPTED)
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

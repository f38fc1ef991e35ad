//! API route definitions

use crate::handlers::{mcp_handler, sse_handler, sse_message_handler};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// MCP transport routes: direct JSON-RPC and the SSE session pair
pub fn mcp_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/sse", get(sse_handler))
        .route("/sse/message", post(sse_message_handler))
}

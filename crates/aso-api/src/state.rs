//! Application state management

use crate::handlers::ToolSet;
use crate::mcp::McpServer;
use aso_core::AppConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Buffered responses per SSE session before senders wait
const SESSION_BUFFER: usize = 32;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// JSON-RPC dispatcher over the active tool set
    pub mcp: McpServer,
    /// Open SSE streams, keyed by session id; values carry serialized responses
    sessions: RwLock<HashMap<String, mpsc::Sender<String>>>,
}

impl AppState {
    pub fn new(config: AppConfig, tools: Arc<dyn ToolSet>) -> Self {
        Self {
            config,
            mcp: McpServer::new(tools),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new SSE session. Sessions whose stream has gone away are
    /// dropped at the same time.
    pub async fn open_session(&self) -> (String, mpsc::Receiver<String>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, sender| !sender.is_closed());
        sessions.insert(id.clone(), tx);
        tracing::debug!(session = %id, open = sessions.len(), "SSE session opened");

        (id, rx)
    }

    /// Sender for a live session
    pub async fn session(&self, id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions
            .read()
            .await
            .get(id)
            .filter(|sender| !sender.is_closed())
            .cloned()
    }

    pub async fn close_session(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::debug!(session = %id, "SSE session closed");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

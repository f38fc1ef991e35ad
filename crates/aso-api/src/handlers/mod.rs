//! Tool handlers and HTTP transport handlers

pub mod entries;
pub mod solutions;
pub mod transport;

pub use entries::EntryTools;
pub use solutions::SolutionTools;
pub use transport::{mcp_handler, not_found, sse_handler, sse_message_handler};

use aso_core::{AppConfig, IndexBackend, StorageMode};
use aso_kv::{MemoryKv, SimpleStore};
use aso_vector::{
    OpenAiEmbedding, PineconeIndex, QdrantIndex, SolutionStore, StoreOptions, VectorIndex,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::Arc;
use utoipa::ToSchema;

/// Entry of a `tools/list` response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The tools one deployment exposes.
///
/// `call` never fails: every outcome, including unknown tools and invalid
/// arguments, is encoded in the returned envelope.
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn call(&self, name: &str, args: Value) -> Value;
}

pub(crate) fn failure(error: impl Display) -> Value {
    json!({ "success": false, "error": error.to_string() })
}

pub(crate) fn unknown_tool(name: &str) -> Value {
    failure(format!("Unknown tool: {name}"))
}

pub(crate) fn envelope(result: aso_core::Result<Value>) -> Value {
    result.unwrap_or_else(failure)
}

/// JSON schema of a tool's arguments, derived from its payload type
pub(crate) fn input_schema<T: ToSchema<'static>>() -> Value {
    let (_, schema) = T::schema();
    serde_json::to_value(schema).unwrap_or_else(|_| empty_schema())
}

pub(crate) fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Wire up the tool set selected by `storage.mode`
pub async fn tools_from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn ToolSet>> {
    match config.storage.mode {
        StorageMode::Vector => {
            let embedder = Arc::new(OpenAiEmbedding::from_config(&config.embedding));
            let index: Arc<dyn VectorIndex> = match config.index.backend {
                IndexBackend::Pinecone => Arc::new(PineconeIndex::from_config(&config.index)?),
                IndexBackend::Qdrant => {
                    let qdrant = QdrantIndex::new(&config.index, config.embedding.dimension())?;
                    qdrant.init_collection().await?;
                    Arc::new(qdrant)
                }
            };
            tracing::info!(
                backend = ?config.index.backend,
                index = %config.index.name,
                namespace = %config.index.namespace,
                policy = ?config.search.policy,
                "Vector storage enabled"
            );

            let store = SolutionStore::new(
                embedder,
                index,
                StoreOptions {
                    policy: config.search.policy,
                    log_payloads: config.logging.log_payloads,
                },
            );
            Ok(Arc::new(SolutionTools::new(Arc::new(store))))
        }
        StorageMode::Fallback => {
            tracing::info!("Fallback key-value storage enabled");
            let store = SimpleStore::new(Arc::new(MemoryKv::new()));
            Ok(Arc::new(EntryTools::new(store)))
        }
    }
}

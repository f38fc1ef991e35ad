//! ASO KV - Fallback storage without embeddings
//!
//! Keeps entries in a prefix-scannable key-value namespace and answers
//! searches with case-insensitive substring matching. Intended for
//! deployments without access to an embedding provider or vector index.

use async_trait::async_trait;
use aso_core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub mod memory;
pub mod store;

pub use memory::MemoryKv;
pub use store::{SimpleStore, ENTRY_PREFIX};

/// A stored snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Lowercased text a search query is matched against
    pub fn haystack(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.code,
            self.tags.join(" ")
        )
        .to_lowercase()
    }
}

/// Arguments of the fallback `upload` tool
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadInput {
    #[validate(length(min = 1, max = 100))]
    #[schema(min_length = 1, max_length = 100)]
    pub title: String,

    #[validate(length(min = 1, max = 500))]
    #[schema(min_length = 1, max_length = 500)]
    pub description: String,

    #[validate(length(min = 1))]
    #[schema(min_length = 1)]
    pub code: String,

    #[validate(length(min = 1, max = 5))]
    #[schema(min_items = 1, max_items = 5)]
    pub tags: Vec<String>,
}

/// Arguments of the fallback `search` tool
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SearchInput {
    #[validate(length(min = 1))]
    #[schema(min_length = 1)]
    pub query: String,
}

/// Prefix-scannable key-value namespace
#[async_trait]
pub trait KvNamespace: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// All entries whose key starts with `prefix`, in key order
    async fn list(&self, prefix: &str) -> Result<Vec<(String, serde_json::Value)>>;
}

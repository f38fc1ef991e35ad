//! ASO Vector - Embeddings and vector index access
//!
//! Wraps the two remote services the solution store depends on:
//! an OpenAI-compatible embedding API and a hosted vector index
//! (Pinecone or Qdrant). No similarity computation happens locally.

use async_trait::async_trait;
use aso_core::{Result, SolutionMetadata};

pub mod embedding;
pub mod pinecone;
pub mod qdrant;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use embedding::{EmbeddingClient, OpenAiEmbedding};
pub use pinecone::PineconeIndex;
pub use qdrant::QdrantIndex;
pub use store::{SolutionLookup, SolutionStore, StoreOptions, SEARCH_TOP_K};

/// A vector with its metadata, as written to the index
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: SolutionMetadata,
}

/// Exact-match restriction on environment metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    /// Lowercased language
    pub language: String,
    /// Lowercased primary library
    pub library: String,
}

/// Nearest-neighbour query
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub filter: Option<MetadataFilter>,
}

/// A record returned by a query or fetch
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    /// Similarity score; absent for fetches and some backends
    pub score: Option<f32>,
    pub metadata: Option<SolutionMetadata>,
}

/// Trait for hosted vector index operations, scoped to one index + namespace
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records; accepted or rejected as a whole
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()>;

    /// Search for the nearest vectors
    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexMatch>>;

    /// Point lookup by id
    async fn fetch(&self, id: &str) -> Result<Option<IndexMatch>>;

    /// Index (or collection) name
    fn index_name(&self) -> &str;

    /// Namespace every operation is scoped to
    fn namespace(&self) -> &str;
}

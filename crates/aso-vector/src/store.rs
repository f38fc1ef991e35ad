//! Solution store
//!
//! Orchestrates the embedding client and the vector index to implement
//! upload, similarity search, point lookup and the health probe.

use crate::{EmbeddingClient, IndexQuery, IndexRecord, MetadataFilter, VectorIndex};
use aso_core::{
    AsoError, HealthStatus, IndexHealth, Result, SearchPayload, SearchPolicy, SearchResult,
    SolutionMetadata, UploadPayload,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Maximum number of results a search returns
pub const SEARCH_TOP_K: usize = 5;

const HEALTH_PROBE_TEXT: &str = "test connectivity";

/// Score reported for point lookups, which bypass similarity ranking
const LOOKUP_SCORE: f32 = 1.0;

/// Knobs that differ between deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub policy: SearchPolicy,
    /// Log raw index responses at debug level
    pub log_payloads: bool,
}

/// Outcome of a point lookup
#[derive(Debug)]
pub enum SolutionLookup {
    Found(SearchResult),
    NotFound,
    /// The fetch itself failed; the record may or may not exist
    Failed(AsoError),
}

impl SolutionLookup {
    /// Collapse into an `Option`, treating lookup failures as absent
    pub fn found(self) -> Option<SearchResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound | Self::Failed(_) => None,
        }
    }
}

/// Vector-backed store of agent-submitted solutions
pub struct SolutionStore {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    options: StoreOptions,
}

impl SolutionStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        options: StoreOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }

    pub fn index_name(&self) -> &str {
        self.index.index_name()
    }

    pub fn namespace(&self) -> &str {
        self.index.namespace()
    }

    pub fn policy(&self) -> SearchPolicy {
        self.options.policy
    }

    /// Embed and upsert a solution, returning its freshly assigned id
    pub async fn store_solution(&self, input: &UploadPayload) -> Result<Uuid> {
        input.validate()?;

        self.write(input).await.map_err(|e| {
            tracing::error!(error = %e, "Error storing solution");
            AsoError::StorageWrite(e.to_string())
        })
    }

    async fn write(&self, input: &UploadPayload) -> Result<Uuid> {
        let bug_id = Uuid::new_v4();
        tracing::info!(%bug_id, "Starting solution storage");

        let text = input.embedding_text();
        tracing::debug!(chars = text.len(), "Generating embedding");
        let embedding = self.embedder.embed_single(&text).await?;
        tracing::debug!(dimensions = embedding.len(), "Generated embedding");

        let record = IndexRecord {
            id: bug_id.to_string(),
            values: embedding,
            metadata: SolutionMetadata::from_upload(input, chrono::Utc::now()),
        };
        if self.options.log_payloads {
            tracing::debug!(metadata = ?record.metadata, "Upsert metadata");
        }

        tracing::debug!(
            index = self.index.index_name(),
            namespace = self.index.namespace(),
            "Upserting vector"
        );
        self.index.upsert(vec![record]).await?;

        tracing::info!(%bug_id, "Stored solution");
        Ok(bug_id)
    }

    /// Find up to five stored solutions similar to the reported problem
    pub async fn search_solutions(&self, input: &SearchPayload) -> Result<Vec<SearchResult>> {
        self.read(input).await.map_err(|e| {
            tracing::error!(error = %e, "Error searching solutions");
            AsoError::StorageRead(e.to_string())
        })
    }

    async fn read(&self, input: &SearchPayload) -> Result<Vec<SearchResult>> {
        let text = input.query_text();
        tracing::info!(query = %text, policy = ?self.options.policy, "Searching solutions");

        let vector = self.embedder.embed_single(&text).await?;

        let filter = match self.options.policy {
            SearchPolicy::EmbeddingOnly => None,
            SearchPolicy::StrictFilter => Some(MetadataFilter {
                language: input.environment.language_key(),
                library: input.environment.library_key(),
            }),
        };

        let matches = self
            .index
            .query(IndexQuery {
                vector,
                top_k: SEARCH_TOP_K,
                include_metadata: true,
                filter,
            })
            .await?;
        if self.options.log_payloads {
            tracing::debug!(?matches, "Index query response");
        }

        let results: Vec<SearchResult> = matches
            .into_iter()
            .take(SEARCH_TOP_K)
            .map(|m| {
                SearchResult::from_metadata(
                    m.id,
                    m.score.unwrap_or(0.0),
                    m.metadata.unwrap_or_default(),
                )
            })
            .collect();

        tracing::info!(count = results.len(), "Search complete");
        Ok(results)
    }

    /// Direct lookup by id, bypassing similarity search
    pub async fn get_solution(&self, id: &str) -> SolutionLookup {
        match self.index.fetch(id).await {
            Ok(Some(record)) => SolutionLookup::Found(SearchResult::from_metadata(
                record.id,
                LOOKUP_SCORE,
                record.metadata.unwrap_or_default(),
            )),
            Ok(None) => SolutionLookup::NotFound,
            Err(e) => {
                tracing::error!(%id, error = %e, "Error getting solution");
                SolutionLookup::Failed(e)
            }
        }
    }

    /// Live probe: one throwaway embedding plus a top-1 query
    pub async fn health_check(&self) -> IndexHealth {
        let status = match self.probe().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                tracing::warn!(error = %e, "Vector index health check failed");
                HealthStatus::Unhealthy
            }
        };

        IndexHealth {
            status,
            index_name: self.index.index_name().to_string(),
            namespace: self.index.namespace().to_string(),
        }
    }

    async fn probe(&self) -> Result<()> {
        let vector = self.embedder.embed_single(HEALTH_PROBE_TEXT).await?;
        self.index
            .query(IndexQuery {
                vector,
                top_k: 1,
                include_metadata: false,
                filter: None,
            })
            .await?;
        Ok(())
    }
}

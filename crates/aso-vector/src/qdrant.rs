//! Qdrant implementation for vector storage
//!
//! The index name maps to a collection; the namespace is a payload field
//! every point carries and every query filters on.

use crate::{IndexMatch, IndexQuery, IndexRecord, MetadataFilter, VectorIndex};
use async_trait::async_trait;
use aso_core::{AsoError, IndexConfig, Result, SolutionMetadata};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::Serialize;
use std::collections::HashMap;

const NAMESPACE_FIELD: &str = "namespace";

/// Qdrant vector index implementation
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    namespace: String,
    dimension: usize,
}

/// Payload stored with each point
#[derive(Debug, Serialize)]
struct PointPayload<'a> {
    namespace: &'a str,
    #[serde(flatten)]
    metadata: &'a SolutionMetadata,
}

impl QdrantIndex {
    /// Create a new Qdrant connection
    pub fn new(config: &IndexConfig, dimension: usize) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.qdrant_url);
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| AsoError::Index(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.name.clone(),
            namespace: config.namespace.clone(),
            dimension,
        })
    }

    /// Create the collection if it does not exist yet (run once on startup)
    pub async fn init_collection(&self) -> Result<()> {
        let collections =
            self.client.list_collections().await.map_err(|e| {
                AsoError::Index(format!("Failed to list collections: {e}"))
            })?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            tracing::info!(collection = %self.collection, dimension = self.dimension, "Creating Qdrant collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| AsoError::Index(format!("Failed to create collection: {e}")))?;
        }

        Ok(())
    }

    fn scope_filter(&self, filter: Option<&MetadataFilter>) -> Filter {
        let mut conditions = vec![Condition::matches(NAMESPACE_FIELD, self.namespace.clone())];
        if let Some(f) = filter {
            conditions.push(Condition::matches("language", f.language.clone()));
            conditions.push(Condition::matches("library", f.library.clone()));
        }
        Filter::must(conditions)
    }
}

fn to_payload(namespace: &str, metadata: &SolutionMetadata) -> Result<HashMap<String, Value>> {
    let json = serde_json::to_value(PointPayload {
        namespace,
        metadata,
    })
    .map_err(|e| AsoError::Index(format!("Failed to encode payload: {e}")))?;

    Ok(match json {
        serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (k, v.into())).collect(),
        _ => HashMap::new(),
    })
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn from_payload(payload: &HashMap<String, Value>) -> SolutionMetadata {
    let field = |key: &str| payload_str(payload, key).unwrap_or_default();
    SolutionMetadata {
        error_type: field("error_type"),
        error_message: field("error_message"),
        agent_summary: field("agent_summary"),
        solution_payload: field("solution_payload"),
        agent_explanation: field("agent_explanation"),
        language: field("language"),
        library: payload_str(payload, "library"),
        created_at: field("created_at"),
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let payload = to_payload(&self.namespace, &record.metadata)?;
            points.push(PointStruct::new(record.id, record.values, payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| AsoError::Index(format!("Failed to upsert vector: {e}")))?;

        Ok(())
    }

    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexMatch>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.vector, query.top_k as u64)
                    .filter(self.scope_filter(query.filter.as_ref()))
                    .with_payload(query.include_metadata),
            )
            .await
            .map_err(|e| AsoError::Index(format!("Vector search failed: {e}")))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| IndexMatch {
                metadata: query
                    .include_metadata
                    .then(|| from_payload(&point.payload)),
                id: point_id_string(point.id),
                score: Some(point.score),
            })
            .collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexMatch>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(id.to_string())])
                    .with_payload(true),
            )
            .await
            .map_err(|e| AsoError::Index(format!("Failed to fetch point: {e}")))?;

        Ok(response
            .result
            .into_iter()
            .find(|point| {
                payload_str(&point.payload, NAMESPACE_FIELD).as_deref()
                    == Some(self.namespace.as_str())
            })
            .map(|point| IndexMatch {
                metadata: Some(from_payload(&point.payload)),
                id: point_id_string(point.id),
                score: None,
            }))
    }

    fn index_name(&self) -> &str {
        &self.collection
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> SolutionMetadata {
        SolutionMetadata {
            error_type: "TypeError".to_string(),
            error_message: "cannot read x of undefined".to_string(),
            agent_summary: "null deref".to_string(),
            solution_payload: "add null check".to_string(),
            agent_explanation: "guard before access".to_string(),
            language: "typescript".to_string(),
            library: Some("react".to_string()),
            created_at: "2024-05-01T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = to_payload("agent-solutions", &metadata()).unwrap();

        assert_eq!(
            payload_str(&payload, NAMESPACE_FIELD).as_deref(),
            Some("agent-solutions")
        );
        assert_eq!(from_payload(&payload), metadata());
    }

    #[test]
    fn test_payload_without_library() {
        let mut meta = metadata();
        meta.library = None;
        let payload = to_payload("ns", &meta).unwrap();

        assert!(!payload.contains_key("library"));
        assert!(from_payload(&payload).library.is_none());
    }

    #[test]
    fn test_point_id_string() {
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(point_id_string(Some(PointId::from(uuid.to_string()))), uuid);
        assert_eq!(point_id_string(Some(PointId::from(7u64))), "7");
        assert_eq!(point_id_string(None), "");
    }
}

//! Pinecone implementation for vector storage
//!
//! Uses the Pinecone data-plane REST API. The index host is taken from
//! configuration or resolved once through the control plane.

use crate::{IndexMatch, IndexQuery, IndexRecord, MetadataFilter, VectorIndex};
use async_trait::async_trait;
use aso_core::{AsoError, IndexConfig, Result, SolutionMetadata};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::OnceCell;

/// Pinecone index client scoped to one namespace
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    index_name: String,
    namespace: String,
    control_url: String,
    api_version: String,
    host: OnceCell<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PineconeVector {
    id: String,
    values: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<SolutionMetadata>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector>,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<SolutionMetadata>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
struct FetchedVector {
    id: String,
    #[serde(default)]
    metadata: Option<SolutionMetadata>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl From<QueryMatch> for IndexMatch {
    fn from(m: QueryMatch) -> Self {
        Self {
            id: m.id,
            score: m.score,
            metadata: m.metadata,
        }
    }
}

/// Pinecone metadata filter for an exact environment match
fn filter_json(filter: &MetadataFilter) -> serde_json::Value {
    serde_json::json!({
        "language": { "$eq": filter.language },
        "library": { "$eq": filter.library },
    })
}

/// Normalize a configured host into a base URL
fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

impl PineconeIndex {
    /// Create a client that resolves its data-plane host lazily
    pub fn new(
        api_key: impl Into<String>,
        index_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let defaults = IndexConfig::default();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            namespace: namespace.into(),
            control_url: defaults.pinecone_control_url,
            api_version: defaults.pinecone_api_version,
            host: OnceCell::new(),
        }
    }

    /// Use a known data-plane host and skip control-plane resolution
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = OnceCell::new_with(Some(base_url(&host.into())));
        self
    }

    /// Create from config
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| AsoError::Config("PINECONE_API_KEY is required".to_string()))?;

        let mut index = Self::new(api_key.clone(), config.name.clone(), config.namespace.clone());
        index.control_url = config.pinecone_control_url.trim_end_matches('/').to_string();
        index.api_version = config.pinecone_api_version.clone();
        if let Some(host) = &config.pinecone_host {
            index = index.with_host(host.clone());
        }
        Ok(index)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AsoError::Index(format!("{action} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AsoError::Index(format!(
                "{action} returned {status}: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AsoError::Index(format!("Failed to parse {action} response: {e}")))
    }

    async fn describe_host(&self) -> Result<String> {
        let url = format!("{}/indexes/{}", self.control_url, self.index_name);
        let described: DescribeIndexResponse =
            self.send(self.request(Method::GET, url), "describe index").await?;
        tracing::info!(index = %self.index_name, host = %described.host, "Resolved Pinecone index host");
        Ok(base_url(&described.host))
    }

    async fn host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| self.describe_host())
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        let url = format!("{}/vectors/upsert", self.host().await?);
        let body = UpsertRequest {
            vectors: records
                .into_iter()
                .map(|r| PineconeVector {
                    id: r.id,
                    values: r.values,
                    metadata: Some(r.metadata),
                })
                .collect(),
            namespace: &self.namespace,
        };

        let response: UpsertResponse = self
            .send(self.request(Method::POST, url).json(&body), "upsert")
            .await?;
        tracing::debug!(upserted = response.upserted_count, "Pinecone upsert complete");

        Ok(())
    }

    async fn query(&self, query: IndexQuery) -> Result<Vec<IndexMatch>> {
        let url = format!("{}/query", self.host().await?);
        let body = QueryRequest {
            namespace: &self.namespace,
            vector: &query.vector,
            top_k: query.top_k,
            include_metadata: query.include_metadata,
            include_values: false,
            filter: query.filter.as_ref().map(filter_json),
        };

        let response: QueryResponse = self
            .send(self.request(Method::POST, url).json(&body), "query")
            .await?;

        Ok(response.matches.into_iter().map(IndexMatch::from).collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<IndexMatch>> {
        let url = format!("{}/vectors/fetch", self.host().await?);
        let request = self
            .request(Method::GET, url)
            .query(&[("ids", id), ("namespace", self.namespace.as_str())]);

        let mut response: FetchResponse = self.send(request, "fetch").await?;

        Ok(response.vectors.remove(id).map(|v| IndexMatch {
            id: v.id,
            score: None,
            metadata: v.metadata,
        }))
    }

    fn index_name(&self) -> &str {
        &self.index_name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

//! Embedding client for generating vector representations
//!
//! Talks to the OpenAI embeddings endpoint (or any API-compatible provider).

use async_trait::async_trait;
use aso_core::{AsoError, EmbeddingConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate one embedding per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AsoError::EmbeddingProvider("No embedding returned".to_string()))
    }

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client.
    ///
    /// A missing key is not an error here; every `embed` call fails instead.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            dimensions: None,
        }
    }

    /// Point at an OpenAI-compatible provider
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Request shortened vectors (text-embedding-3 models only)
    pub fn with_dimensions(mut self, dimensions: Option<usize>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.api_key.clone(), config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_dimensions(config.dimensions)
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

/// Restore input order and check one vector came back per input
fn ordered_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(AsoError::EmbeddingProvider(format!(
            "expected {expected} embeddings, provider returned {}",
            data.len()
        )));
    }
    data.sort_by_key(|e| e.index);
    Ok(data.into_iter().map(|e| e.embedding).collect())
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AsoError::Authentication("OPENAI_API_KEY is required".to_string()))?;

        let request = OpenAiEmbeddingRequest {
            input: texts,
            model: &self.model,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AsoError::EmbeddingProvider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Embedding provider rejected request");
            return Err(AsoError::EmbeddingProvider(format!(
                "provider returned {status}: {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AsoError::EmbeddingProvider(format!("invalid response: {e}")))?;

        ordered_embeddings(result.data, texts.len())
    }

    fn dimension(&self) -> usize {
        EmbeddingConfig {
            model: self.model.clone(),
            dimensions: self.dimensions,
            ..Default::default()
        }
        .dimension()
    }
}

// ============================================================================
// Tests
// ============================================================================

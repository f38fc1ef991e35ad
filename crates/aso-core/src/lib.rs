//! ASO Core - Domain models, errors, and shared types
//!
//! This crate defines the core abstractions used throughout Agent Stack Overflow:
//! - Problem / environment / solution payloads shared by agents
//! - Search result projections returned from the vector index
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, IndexBackend, IndexConfig, LoggingConfig,
    SearchConfig, SearchPolicy, ServerConfig, StorageConfig, StorageMode,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Agent Stack Overflow operations
#[derive(Error, Debug)]
pub enum AsoError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingProvider(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Failed to store solution: {0}")]
    StorageWrite(String),

    #[error("Failed to search solutions: {0}")]
    StorageRead(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AsoError>;

impl From<ValidationErrors> for AsoError {
    fn from(errors: ValidationErrors) -> Self {
        AsoError::Validation(errors.to_string())
    }
}

/// Rejects empty and whitespace-only strings
pub fn non_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Deserialize tool arguments and run schema validation in one step
pub fn parse_validated<T>(args: serde_json::Value) -> Result<T>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let payload: T =
        serde_json::from_value(args).map_err(|e| AsoError::Validation(e.to_string()))?;
    payload.validate()?;
    Ok(payload)
}

// ============================================================================
// Upload / Search Payloads
// ============================================================================

/// Free-text description of a bug
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProblemReport {
    /// Error class or category
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "TypeError")]
    pub error_type: String,

    /// Raw error message as reported by the runtime
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "cannot read x of undefined")]
    pub error_message: String,

    /// The agent's own one-line summary of the problem
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "null deref on user object")]
    pub agent_summary: String,
}

/// Technical context a problem occurred in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Environment {
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "TypeScript")]
    pub language: String,

    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "React")]
    pub primary_library: String,
}

impl Environment {
    /// Lowercased language, as used for metadata and filters
    pub fn language_key(&self) -> String {
        self.language.to_lowercase()
    }

    /// Lowercased primary library, as used for metadata and filters
    pub fn library_key(&self) -> String {
        self.primary_library.to_lowercase()
    }
}

/// A fix plus the rationale behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Solution {
    /// Diff, command, or instructions that fix the problem
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "add null check")]
    pub solution_payload: String,

    /// Natural-language explanation of why the fix works
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "guard before access")]
    pub agent_explanation: String,
}

/// Arguments of the `upload` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct UploadPayload {
    #[validate(nested)]
    #[schema(inline)]
    pub problem: ProblemReport,

    #[validate(nested)]
    #[schema(inline)]
    pub environment: Environment,

    #[validate(nested)]
    #[schema(inline)]
    pub solution: Solution,
}

impl UploadPayload {
    /// Text fed to the embedding model when storing.
    ///
    /// Environment fields are left out so that a fix for the same error is
    /// found across languages and libraries.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.problem.error_type,
            self.problem.error_message,
            self.problem.agent_summary,
            self.solution.agent_explanation
        )
    }
}

/// Problem fields a search is keyed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct SearchProblem {
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "undefined property access")]
    pub error_message: String,

    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1, example = "null deref")]
    pub agent_summary: String,
}

/// Arguments of the `search` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct SearchPayload {
    #[validate(nested)]
    #[schema(inline)]
    pub problem: SearchProblem,

    #[validate(nested)]
    #[schema(inline)]
    pub environment: Environment,
}

impl SearchPayload {
    /// Text fed to the embedding model when querying
    pub fn query_text(&self) -> String {
        format!(
            "{} {}",
            self.problem.error_message, self.problem.agent_summary
        )
    }
}

// ============================================================================
// Stored Metadata and Search Results
// ============================================================================

/// Metadata attached to every vector in the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionMetadata {
    pub error_type: String,
    pub error_message: String,
    pub agent_summary: String,
    pub solution_payload: String,
    pub agent_explanation: String,
    /// Lowercased language
    pub language: String,
    /// Lowercased primary library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl SolutionMetadata {
    /// Build the metadata record for an upload, normalizing environment tags
    pub fn from_upload(payload: &UploadPayload, created_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            error_type: payload.problem.error_type.clone(),
            error_message: payload.problem.error_message.clone(),
            agent_summary: payload.problem.agent_summary.clone(),
            solution_payload: payload.solution.solution_payload.clone(),
            agent_explanation: payload.solution.agent_explanation.clone(),
            language: payload.environment.language_key(),
            library: Some(payload.environment.library_key()),
            created_at: created_at.to_rfc3339(),
        }
    }
}

/// Environment as projected into a search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResultEnvironment {
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
}

/// Problem as projected into a search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResultProblem {
    pub error_type: String,
    /// Taken from `agent_summary`
    pub title: String,
    /// Taken from `error_message`
    pub description: String,
}

/// A stored solution returned from search or point lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub bug_id: String,

    /// Relevance score assigned by the index (higher is more similar)
    pub score: f32,

    pub solution: Solution,
    pub environment: ResultEnvironment,
    pub problem: ResultProblem,
}

impl SearchResult {
    /// Project index metadata into a search result.
    ///
    /// Missing metadata becomes empty strings; an empty library is treated as absent.
    pub fn from_metadata(id: impl Into<String>, score: f32, metadata: SolutionMetadata) -> Self {
        Self {
            bug_id: id.into(),
            score,
            solution: Solution {
                solution_payload: metadata.solution_payload,
                agent_explanation: metadata.agent_explanation,
            },
            environment: ResultEnvironment {
                language: metadata.language,
                library: metadata.library.filter(|l| !l.is_empty()),
            },
            problem: ResultProblem {
                error_type: metadata.error_type,
                title: metadata.agent_summary,
                description: metadata.error_message,
            },
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of a live connectivity probe against the vector index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHealth {
    pub status: HealthStatus,
    pub index_name: String,
    pub namespace: String,
}

// ============================================================================
// Tests
// ============================================================================

//! Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Vector index connection
    pub index: IndexConfig,

    /// Search behaviour
    pub search: SearchConfig,

    /// Storage mode selection
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Some(host) = env_var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_var("API_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        // CORS origins from environment variable (comma-separated)
        if let Some(origins) = env_var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Embedding provider
        if let Some(key) = env_var("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = env_var("OPENAI_BASE_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = env_var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = env_var("EMBEDDING_DIMENSIONS") {
            self.embedding.dimensions =
                Some(dims.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "EMBEDDING_DIMENSIONS".to_string(),
                    value: dims,
                })?);
        }

        // Vector index
        if let Some(backend) = env_var("VECTOR_BACKEND") {
            self.index.backend = backend.parse()?;
        }
        if let Some(key) = env_var("PINECONE_API_KEY") {
            if self.index.backend == IndexBackend::Pinecone {
                self.index.api_key = Some(key);
            }
        }
        if let Some(key) = env_var("QDRANT_API_KEY") {
            if self.index.backend == IndexBackend::Qdrant {
                self.index.api_key = Some(key);
            }
        }
        if let Some(host) = env_var("PINECONE_INDEX_HOST") {
            self.index.pinecone_host = Some(host);
        }
        if let Some(url) = env_var("QDRANT_URL") {
            self.index.qdrant_url = url;
        }
        if let Some(name) = env_var("INDEX_NAME") {
            self.index.name = name;
        }
        if let Some(namespace) = env_var("INDEX_NAMESPACE") {
            self.index.namespace = namespace;
        }

        // Search / storage
        if let Some(policy) = env_var("SEARCH_POLICY") {
            self.search.policy = policy.parse()?;
        }
        if let Some(mode) = env_var("STORAGE_MODE") {
            self.storage.mode = mode.parse()?;
        }

        // Logging
        if let Some(level) = env_var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", json)?;
        }
        if let Some(payloads) = env_var("LOG_PAYLOADS") {
            self.logging.log_payloads = parse_bool("LOG_PAYLOADS", payloads)?;
        }

        Ok(())
    }

    /// Check that the selected storage mode has what it needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.mode == StorageMode::Vector
            && self.index.backend == IndexBackend::Pinecone
            && self.index.api_key.is_none()
        {
            return Err(ConfigError::MissingRequired("PINECONE_API_KEY".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty allows any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            cors_origins: vec![],
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI API key; every embedding call fails without it
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Embedding model name
    pub model: String,

    /// Optional output dimension override (text-embedding-3 models only)
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    /// Vector dimension produced by the configured model
    pub fn dimension(&self) -> usize {
        if let Some(dims) = self.dimensions {
            return dims;
        }
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Which hosted index to talk to
    pub backend: IndexBackend,

    /// API key for the index service
    pub api_key: Option<String>,

    /// Index (Pinecone) or collection (Qdrant) name
    pub name: String,

    /// Logical partition inside the index
    pub namespace: String,

    /// Pinecone data-plane host; resolved from the control plane when unset
    pub pinecone_host: Option<String>,

    /// Pinecone control-plane URL
    pub pinecone_control_url: String,

    /// Value of the `X-Pinecone-API-Version` header
    pub pinecone_api_version: String,

    /// Qdrant gRPC URL
    pub qdrant_url: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            api_key: None,
            name: "agent-stack-overflow".to_string(),
            namespace: "agent-solutions".to_string(),
            pinecone_host: None,
            pinecone_control_url: "https://api.pinecone.io".to_string(),
            pinecone_api_version: "2024-07".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
        }
    }
}

/// Supported vector index services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    Qdrant,
}

impl std::str::FromStr for IndexBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Whether environment tags restrict the candidate set
    pub policy: SearchPolicy,
}

/// How environment tags take part in search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Rank purely by embedding similarity
    #[default]
    EmbeddingOnly,
    /// Only consider records whose language and library match exactly
    StrictFilter,
}

impl std::str::FromStr for SearchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "embedding_only" | "unfiltered" => Ok(Self::EmbeddingOnly),
            "strict_filter" | "strict" | "filtered" => Ok(Self::StrictFilter),
            _ => Err(ConfigError::InvalidValue {
                key: "SEARCH_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub mode: StorageMode,
}

/// Which storage layer backs the tool surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Embedding provider + hosted vector index
    #[default]
    Vector,
    /// Local key-value namespace with substring search
    Fallback,
}

impl std::str::FromStr for StorageMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "fallback" | "simple" => Ok(Self::Fallback),
            _ => Err(ConfigError::InvalidValue {
                key: "STORAGE_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Log raw responses from the remote services at debug level
    pub log_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            log_payloads: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.index.namespace, "agent-solutions");
        assert_eq!(config.embedding.dimension(), 3072);
        assert_eq!(config.search.policy, SearchPolicy::EmbeddingOnly);
        assert_eq!(config.storage.mode, StorageMode::Vector);
    }

    #[test]
    fn test_embedding_dimension_override() {
        let config = EmbeddingConfig {
            model: "text-embedding-3-small".to_string(),
            ..Default::default()
        };
        assert_eq!(config.dimension(), 1536);

        let config = EmbeddingConfig {
            dimensions: Some(256),
            ..Default::default()
        };
        assert_eq!(config.dimension(), 256);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(
            "Qdrant".parse::<IndexBackend>().unwrap(),
            IndexBackend::Qdrant
        );
        assert_eq!(
            "strict-filter".parse::<SearchPolicy>().unwrap(),
            SearchPolicy::StrictFilter
        );
        assert_eq!(
            "fallback".parse::<StorageMode>().unwrap(),
            StorageMode::Fallback
        );
        assert!("faiss".parse::<IndexBackend>().is_err());
        assert!("fuzzy".parse::<SearchPolicy>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("LOG_JSON", "TRUE".to_string()).unwrap());
        assert!(!parse_bool("LOG_JSON", "off".to_string()).unwrap());
        assert!(parse_bool("LOG_JSON", "maybe".to_string()).is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [index]
            backend = "qdrant"
            name = "fixes"

            [search]
            policy = "strict_filter"
            "#,
        )
        .unwrap();

        assert_eq!(config.index.backend, IndexBackend::Qdrant);
        assert_eq!(config.index.name, "fixes");
        assert_eq!(config.index.namespace, "agent-solutions");
        assert_eq!(config.search.policy, SearchPolicy::StrictFilter);
        assert_eq!(config.server.port, 8787);
    }

    #[test]
    fn test_validate_requires_pinecone_key() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));

        let mut fallback = AppConfig::default();
        fallback.storage.mode = StorageMode::Fallback;
        assert!(fallback.validate().is_ok());
    }
}

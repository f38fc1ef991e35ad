//! In-process key-value namespace

use crate::KvNamespace;
use async_trait::async_trait;
use aso_core::Result;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Ordered in-memory map; contents live as long as the process
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvNamespace for MemoryKv {
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

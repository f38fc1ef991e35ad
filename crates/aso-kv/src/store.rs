//! Substring-matching entry store

use crate::{Entry, KvNamespace, UploadInput};
use aso_core::{AsoError, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Key prefix every entry is stored under
pub const ENTRY_PREFIX: &str = "entry:";

/// Entry store over an injected key-value namespace
pub struct SimpleStore {
    kv: Arc<dyn KvNamespace>,
}

impl SimpleStore {
    pub fn new(kv: Arc<dyn KvNamespace>) -> Self {
        Self { kv }
    }

    /// Persist a new entry under `entry:<id>`
    pub async fn store(&self, input: UploadInput) -> Result<Entry> {
        input.validate()?;

        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            code: input.code,
            tags: input.tags,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&entry)
            .map_err(|e| AsoError::StorageWrite(format!("Failed to encode entry: {e}")))?;
        self.kv
            .put(&format!("{ENTRY_PREFIX}{}", entry.id), value)
            .await
            .map_err(|e| AsoError::StorageWrite(e.to_string()))?;

        tracing::info!(id = %entry.id, "Stored entry");
        Ok(entry)
    }

    /// Entries containing `query` (case-insensitive), newest first
    pub async fn search(&self, query: &str) -> Result<Vec<Entry>> {
        let needle = query.to_lowercase();
        let listed = self
            .kv
            .list(ENTRY_PREFIX)
            .await
            .map_err(|e| AsoError::StorageRead(e.to_string()))?;

        let mut entries: Vec<Entry> = listed
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<Entry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "Skipping undecodable entry");
                    None
                }
            })
            .filter(|entry| entry.haystack().contains(&needle))
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!(query, count = entries.len(), "Entry search complete");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;
    use chrono::TimeZone;

    fn input(title: &str, tags: &[&str]) -> UploadInput {
        UploadInput {
            title: title.to_string(),
            description: "Cannot read property of undefined".to_string(),
            code: "if (user) { render(user.name) }".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn store() -> (SimpleStore, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        (SimpleStore::new(kv.clone()), kv)
    }

    #[tokio::test]
    async fn test_store_persists_under_prefix() {
        let (store, kv) = store();
        let entry = store.store(input("Null guard", &["react"])).await.unwrap();

        assert!(Uuid::parse_str(&entry.id).is_ok());
        let listed = kv.list(ENTRY_PREFIX).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, format!("entry:{}", entry.id));
        assert_eq!(listed[0].1["createdAt"], serde_json::json!(entry.created_at));
    }

    #[tokio::test]
    async fn test_store_rejects_invalid_input() {
        let (store, kv) = store();

        let no_tags = store.store(input("Null guard", &[])).await.unwrap_err();
        assert!(matches!(no_tags, AsoError::Validation(_)));

        let long_title = store.store(input(&"x".repeat(101), &["a"])).await.unwrap_err();
        assert!(matches!(long_title, AsoError::Validation(_)));

        let too_many = store
            .store(input("t", &["a", "b", "c", "d", "e", "f"]))
            .await
            .unwrap_err();
        assert!(matches!(too_many, AsoError::Validation(_)));

        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_across_fields() {
        let (store, _) = store();
        store.store(input("Null guard", &["React"])).await.unwrap();
        store.store(input("Lifetime fix", &["rust"])).await.unwrap();

        assert_eq!(store.search("REACT").await.unwrap().len(), 1);
        assert_eq!(store.search("user.name").await.unwrap().len(), 2);
        assert_eq!(store.search("undefined").await.unwrap().len(), 2);
        assert!(store.search("python").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_orders_newest_first() {
        let kv = Arc::new(MemoryKv::new());
        let store = SimpleStore::new(kv.clone());

        for (id, day) in [("a", 1), ("b", 3), ("c", 2)] {
            let entry = Entry {
                id: id.to_string(),
                title: format!("Fix {id}"),
                description: "panic in worker".to_string(),
                code: "unwrap_or_default()".to_string(),
                tags: vec!["rust".to_string()],
                created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            };
            kv.put(
                &format!("{ENTRY_PREFIX}{id}"),
                serde_json::to_value(&entry).unwrap(),
            )
            .await
            .unwrap();
        }

        let ids: Vec<String> = store
            .search("panic")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_search_skips_foreign_values() {
        let (store, kv) = store();
        kv.put("entry:broken", serde_json::json!({ "nope": true }))
            .await
            .unwrap();
        store.store(input("Null guard", &["react"])).await.unwrap();

        assert_eq!(store.search("guard").await.unwrap().len(), 1);
    }
}

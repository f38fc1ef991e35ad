//! Fallback mode tools over the key-value store

use super::{envelope, input_schema, unknown_tool, ToolDefinition, ToolSet};
use aso_core::{parse_validated, Result};
use aso_kv::{SearchInput, SimpleStore, UploadInput};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct EntryTools {
    store: SimpleStore,
}

impl EntryTools {
    pub fn new(store: SimpleStore) -> Self {
        Self { store }
    }

    async fn upload(&self, args: Value) -> Result<Value> {
        let input: UploadInput = parse_validated(args)?;
        let entry = self.store.store(input).await?;
        Ok(json!({
            "success": true,
            "message": "Entry uploaded successfully",
            "entry": entry,
        }))
    }

    async fn search(&self, args: Value) -> Result<Value> {
        let input: SearchInput = parse_validated(args)?;
        let results = self.store.search(&input.query).await?;
        let noun = if results.len() == 1 { "entry" } else { "entries" };

        Ok(json!({
            "success": true,
            "message": format!("Found {} {noun}", results.len()),
            "query": input.query,
            "results": results,
        }))
    }
}

#[async_trait]
impl ToolSet for EntryTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "upload",
                description: "Upload a code entry with tags",
                input_schema: input_schema::<UploadInput>(),
            },
            ToolDefinition {
                name: "search",
                description: "Search entries by keyword",
                input_schema: input_schema::<SearchInput>(),
            },
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Value {
        match name {
            "upload" => envelope(self.upload(args).await),
            "search" => envelope(self.search(args).await),
            other => unknown_tool(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aso_kv::MemoryKv;
    use std::sync::Arc;

    fn tools() -> EntryTools {
        EntryTools::new(SimpleStore::new(Arc::new(MemoryKv::new())))
    }

    fn entry_args(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Borrow checker complains about a moved value",
            "code": "let b = a.clone();",
            "tags": ["rust", "ownership"]
        })
    }

    #[tokio::test]
    async fn test_upload_and_search() {
        let tools = tools();

        let uploaded = tools.call("upload", entry_args("Use after move")).await;
        assert_eq!(uploaded["success"], true);
        assert_eq!(uploaded["message"], "Entry uploaded successfully");
        assert!(uploaded["entry"]["createdAt"].is_string());

        let one = tools.call("search", json!({ "query": "OWNERSHIP" })).await;
        assert_eq!(one["message"], "Found 1 entry");
        assert_eq!(one["query"], "OWNERSHIP");
        assert_eq!(one["results"][0]["title"], "Use after move");

        tools.call("upload", entry_args("Clone to satisfy borrowck")).await;
        let two = tools.call("search", json!({ "query": "clone" })).await;
        assert_eq!(two["message"], "Found 2 entries");

        let none = tools.call("search", json!({ "query": "python" })).await;
        assert_eq!(none["message"], "Found 0 entries");
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tools = tools();

        let mut args = entry_args("t");
        args["tags"] = json!([]);
        assert_eq!(tools.call("upload", args).await["success"], false);

        assert_eq!(tools.call("search", json!({ "query": "" })).await["success"], false);
        assert_eq!(tools.call("search", json!({})).await["success"], false);
    }

    #[tokio::test]
    async fn test_vector_only_tools_are_unknown() {
        let result = tools().call("health", json!({})).await;
        assert_eq!(result["error"], "Unknown tool: health");
    }
}

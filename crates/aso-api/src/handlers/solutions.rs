//! Vector mode tools: upload, search, health and get

use super::{empty_schema, envelope, input_schema, unknown_tool, ToolDefinition, ToolSet};
use aso_core::{non_blank, parse_validated, Result, SearchPayload, UploadPayload};
use aso_vector::{SolutionLookup, SolutionStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

pub const UPLOAD_MESSAGE: &str = "Solution uploaded successfully with vector embedding!";

/// Arguments of the `get` tool
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GetInput {
    #[serde(rename = "bugId")]
    #[validate(custom(function = "non_blank"))]
    #[schema(min_length = 1)]
    pub bug_id: String,
}

pub struct SolutionTools {
    store: Arc<SolutionStore>,
}

impl SolutionTools {
    pub fn new(store: Arc<SolutionStore>) -> Self {
        Self { store }
    }

    async fn upload(&self, args: Value) -> Result<Value> {
        let payload: UploadPayload = parse_validated(args)?;
        let bug_id = self.store.store_solution(&payload).await?;

        Ok(json!({
            "success": true,
            "message": UPLOAD_MESSAGE,
            "bugId": bug_id.to_string(),
            "problem": {
                "error_type": payload.problem.error_type,
                "agent_summary": payload.problem.agent_summary,
            },
            "environment": payload.environment,
        }))
    }

    async fn search(&self, args: Value) -> Result<Value> {
        let payload: SearchPayload = parse_validated(args)?;
        let results = self.store.search_solutions(&payload).await?;

        Ok(json!({
            "success": true,
            "message": format!("Found {} solution(s) using vector similarity", results.len()),
            "query": {
                "error_message": payload.problem.error_message,
                "agent_summary": payload.problem.agent_summary,
            },
            "environment": payload.environment,
            "results": results,
        }))
    }

    /// Always reports the service itself as up; the index probe goes under `pinecone`
    async fn health(&self) -> Value {
        let index = self.store.health_check().await;
        json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "pinecone": index,
        })
    }

    async fn get(&self, args: Value) -> Result<Value> {
        let input: GetInput = parse_validated(args)?;

        Ok(match self.store.get_solution(&input.bug_id).await {
            SolutionLookup::Found(result) => json!({ "success": true, "result": result }),
            SolutionLookup::NotFound => json!({ "success": false, "error": "Solution not found" }),
            SolutionLookup::Failed(e) => {
                json!({ "success": false, "error": format!("Lookup failed: {e}") })
            }
        })
    }
}

#[async_trait]
impl ToolSet for SolutionTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "upload",
                description: "Upload a bug fix solution",
                input_schema: input_schema::<UploadPayload>(),
            },
            ToolDefinition {
                name: "search",
                description: "Search for solutions using vector similarity",
                input_schema: input_schema::<SearchPayload>(),
            },
            ToolDefinition {
                name: "health",
                description: "Check system health",
                input_schema: empty_schema(),
            },
            ToolDefinition {
                name: "get",
                description: "Fetch a stored solution by its bugId",
                input_schema: input_schema::<GetInput>(),
            },
        ]
    }

    async fn call(&self, name: &str, args: Value) -> Value {
        match name {
            "upload" => envelope(self.upload(args).await),
            "search" => envelope(self.search(args).await),
            "health" => self.health().await,
            "get" => envelope(self.get(args).await),
            other => unknown_tool(other),
        }
    }
}

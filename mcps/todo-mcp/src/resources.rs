//! Read-only resources and prompts exposed next to the todo tools

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mcp_common::{
    invalid_params, not_found, McpResult, PromptHandler, PromptMessage,
    PromptResult, ResourceContents, ResourceReader, ResultExt, Role,
};

use crate::handlers::build_summary;
use crate::repository::TodoRepository;
use crate::types::TodoFilter;

pub const TODOS_TEMPLATE: &str = "todos://{filter}";
pub const CURRENT_TIME_URI: &str = "todo-manager://current-time";
pub const SUMMARIZE_PROMPT: &str = "summarize-todos";

/// `todos://{all|completed|incomplete}` as a JSON array of records
pub struct TodosResource {
    repository: TodoRepository,
}

impl TodosResource {
    pub fn new(repository: TodoRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ResourceReader for TodosResource {
    async fn read(
        &self,
        uri: &str,
        vars: HashMap<String, String>,
    ) -> McpResult<Vec<ResourceContents>> {
        // Listed resources are registered by exact URI and carry no vars
        let name = vars
            .get("filter")
            .map(String::as_str)
            .or_else(|| uri.strip_prefix("todos://"))
            .unwrap_or_default();
        let filter = TodoFilter::from_name(name)
            .ok_or_else(|| not_found(format!("Resource not found: {}", uri)))?;

        let todos = self.repository.list(filter).await.to_mcp_err()?;
        let text = serde_json::to_string_pretty(&todos).to_mcp_err()?;
        Ok(vec![ResourceContents::json(uri, text)])
    }
}

/// Current server time, RFC 3339 in UTC
pub struct CurrentTimeResource;

#[async_trait]
impl ResourceReader for CurrentTimeResource {
    async fn read(
        &self,
        uri: &str,
        _vars: HashMap<String, String>,
    ) -> McpResult<Vec<ResourceContents>> {
        Ok(vec![ResourceContents::text(uri, Utc::now().to_rfc3339())])
    }
}

/// `summarize-todos` prompt: the summary as a user/assistant exchange
pub struct SummarizePrompt {
    repository: TodoRepository,
}

impl SummarizePrompt {
    pub fn new(repository: TodoRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl PromptHandler for SummarizePrompt {
    async fn render(&self, arguments: HashMap<String, String>) -> McpResult<PromptResult> {
        let completed = match arguments.get("completed").map(String::as_str) {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(invalid_params(format!(
                    "Prompt argument `completed` must be \"true\" or \"false\", got {:?}",
                    other
                )))
            }
        };
        let filter = TodoFilter::from_completed(completed);
        let summary = build_summary(&self.repository, filter).await?;

        let request = match filter.qualifier() {
            Some(q) => format!("Please summarize my {} todos.", q),
            None => "Please summarize all my todos.".to_string(),
        };

        Ok(PromptResult {
            description: Some("Summary of todo items".to_string()),
            messages: vec![
                PromptMessage::text(Role::User, request),
                PromptMessage::text(Role::Assistant, summary.summary_text),
            ],
        })
    }
}

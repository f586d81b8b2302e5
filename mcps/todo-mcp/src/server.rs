//! MCP Server implementation for todo management
//!
//! This module wires todo operations, resources and prompts into the shared
//! registries and answers every session-independent protocol method.
//! Handler implementations are in the handlers module.

use std::sync::Arc;

use mcp_common::{
    handler_fn, invalid_params, jsonrpc::negotiate_protocol_version, unknown_operation,
    FieldType, InitializeParams, InitializeResult, InputContract, InvocationContext, McpResult,
    OperationRegistry, OutputContract, PromptArgument, PromptDescriptor, PromptRegistry,
    RegistryError, ResourceDescriptor, ResourceRegistry, ResourceTemplateDescriptor,
    ServerCapabilities, ServerIdentity,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers;
use crate::repository::TodoRepository;
use crate::resources::{
    CurrentTimeResource, SummarizePrompt, TodosResource, CURRENT_TIME_URI, SUMMARIZE_PROMPT,
    TODOS_TEMPLATE,
};
use crate::types::{DeleteOutcome, Todo, TodoFilter, TodoListResponse, TodoSummary};

const INSTRUCTIONS: &str = "Todo list server. Use createTodo, listTodos, updateTodo and \
     deleteTodo to manage todo items, summarizeTodos for an overview, and the todos:// \
     resources to read the list directly.";

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// The main Todo MCP Server
pub struct TodoMcpServer {
    repository: TodoRepository,
    operations: OperationRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    identity: ServerIdentity,
}

impl TodoMcpServer {
    /// Build the server and fill its registries. Any registration conflict
    /// is a startup failure.
    pub fn new(repository: TodoRepository) -> Result<Self, RegistryError> {
        let operations = register_operations(&repository)?;
        let resources = register_resources(&repository)?;
        let prompts = register_prompts(&repository)?;

        tracing::info!(
            operations = operations.len(),
            path = ?repository.path(),
            "Todo MCP server ready"
        );

        Ok(Self {
            repository,
            operations,
            resources,
            prompts,
            identity: ServerIdentity {
                name: "todo-mcp".to_string(),
                title: Some("Todo Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    pub fn repository(&self) -> &TodoRepository {
        &self.repository
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn capabilities() -> ServerCapabilities {
        ServerCapabilities::builder()
            .enable_logging()
            .enable_prompts()
            .enable_resources()
            .enable_tools()
            .build()
    }

    pub fn initialize(&self, params: &InitializeParams) -> InitializeResult {
        InitializeResult {
            protocol_version: negotiate_protocol_version(&params.protocol_version).to_string(),
            capabilities: Self::capabilities(),
            server_info: self.identity.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    /// Answer a session-independent request.
    ///
    /// Lifecycle methods (`initialize`, `logging/setLevel`) belong to the
    /// session and never reach this point.
    pub async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: InvocationContext,
    ) -> McpResult<Value> {
        match method {
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.operations.list() })),
            "tools/call" => {
                let call: CallToolParams = decode_params(params)?;
                let result = self
                    .operations
                    .invoke(&call.name, call.arguments, ctx)
                    .await?;
                to_value(&result)
            }
            "resources/list" => Ok(json!({ "resources": self.resources.list() })),
            "resources/templates/list" => {
                Ok(json!({ "resourceTemplates": self.resources.list_templates() }))
            }
            "resources/read" => {
                let read: ReadResourceParams = decode_params(params)?;
                let contents = self.resources.read(&read.uri).await?;
                Ok(json!({ "contents": contents }))
            }
            "prompts/list" => Ok(json!({ "prompts": self.prompts.list() })),
            "prompts/get" => {
                let get: GetPromptParams = decode_params(params)?;
                let result = self.prompts.get(&get.name, get.arguments).await?;
                to_value(&result)
            }
            other => Err(unknown_operation(other)),
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| invalid_params(format!("Invalid params: {}", e)))
}

fn to_value<T: serde::Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| mcp_common::internal_error(e.to_string()))
}

// ============================================================================
// Registration
// ============================================================================

fn register_operations(repository: &TodoRepository) -> Result<OperationRegistry, RegistryError> {
    let mut operations = OperationRegistry::new();

    let repo = repository.clone();
    operations.register_operation(
        "createTodo",
        "Create a new todo item",
        InputContract::new()
            .required("title", FieldType::String, "Title of the todo")
            .with_default(
                "completed",
                FieldType::Boolean,
                json!(false),
                "Task completion status",
            ),
        Some(OutputContract::of::<Todo>()),
        handler_fn(move |args, ctx| {
            let repo = repo.clone();
            async move { handlers::create_todo(&repo, args.parse()?, &ctx).await }
        }),
    )?;

    let repo = repository.clone();
    operations.register_operation(
        "listTodos",
        "List all todo items",
        InputContract::new().optional(
            "completed",
            FieldType::Boolean,
            "Filter by completion status",
        ),
        Some(OutputContract::of::<TodoListResponse>()),
        handler_fn(move |args, ctx| {
            let repo = repo.clone();
            async move { handlers::list_todos(&repo, args.parse()?, &ctx).await }
        }),
    )?;

    let repo = repository.clone();
    operations.register_operation(
        "updateTodo",
        "Update an existing todo",
        InputContract::new()
            .required("id", FieldType::String, "Todo ID to update")
            .optional("title", FieldType::String, "New title for the todo")
            .optional("completed", FieldType::Boolean, "New completion status"),
        Some(OutputContract::of::<Todo>()),
        handler_fn(move |args, ctx| {
            let repo = repo.clone();
            async move { handlers::update_todo(&repo, args.parse()?, &ctx).await }
        }),
    )?;

    let repo = repository.clone();
    operations.register_operation(
        "deleteTodo",
        "Delete an existing todo",
        InputContract::new().required("id", FieldType::String, "Todo ID to delete"),
        Some(OutputContract::of::<DeleteOutcome>()),
        handler_fn(move |args, ctx| {
            let repo = repo.clone();
            async move { handlers::delete_todo(&repo, args.parse()?, &ctx).await }
        }),
    )?;

    let repo = repository.clone();
    operations.register_operation(
        "summarizeTodos",
        "Summarize todo items, optionally filtering by completion status",
        InputContract::new().optional(
            "completed",
            FieldType::Boolean,
            "Summarize only completed (true) or incomplete (false) todos",
        ),
        Some(OutputContract::of::<TodoSummary>()),
        handler_fn(move |args, ctx| {
            let repo = repo.clone();
            async move { handlers::summarize_todos(&repo, args.parse()?, &ctx).await }
        }),
    )?;

    Ok(operations)
}

fn register_resources(repository: &TodoRepository) -> Result<ResourceRegistry, RegistryError> {
    let mut resources = ResourceRegistry::new();
    let todos = Arc::new(TodosResource::new(repository.clone()));

    for filter in [TodoFilter::All, TodoFilter::Completed, TodoFilter::Incomplete] {
        resources.register_resource(
            ResourceDescriptor {
                uri: format!("todos://{}", filter.name()),
                name: format!("{} todos", filter.name()),
                description: Some(format!("Todo records matching `{}`", filter.name())),
                mime_type: Some("application/json".to_string()),
            },
            todos.clone(),
        )?;
    }

    resources.register_template(
        ResourceTemplateDescriptor {
            uri_template: TODOS_TEMPLATE.to_string(),
            name: "todos".to_string(),
            description: Some("Todo records filtered by all, completed or incomplete".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        todos,
    )?;

    resources.register_resource(
        ResourceDescriptor {
            uri: CURRENT_TIME_URI.to_string(),
            name: "current_time".to_string(),
            description: Some("Current server time".to_string()),
            mime_type: Some("text/plain".to_string()),
        },
        Arc::new(CurrentTimeResource),
    )?;

    Ok(resources)
}

fn register_prompts(repository: &TodoRepository) -> Result<PromptRegistry, RegistryError> {
    let mut prompts = PromptRegistry::new();
    prompts.register_prompt(
        PromptDescriptor {
            name: SUMMARIZE_PROMPT.to_string(),
            description: Some(
                "Generates a summary of todo items, optionally filtering by completion status."
                    .to_string(),
            ),
            arguments: vec![PromptArgument {
                name: "completed".to_string(),
                description: Some(
                    "\"true\" for completed, \"false\" for incomplete; omit for all todos"
                        .to_string(),
                ),
                required: false,
            }],
        },
        Arc::new(SummarizePrompt::new(repository.clone())),
    )?;
    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_common::{ErrorKind, RequestId};

    fn create_test_server() -> (tempfile::TempDir, TodoMcpServer) {
        let dir = tempfile::tempdir().unwrap();
        let server = TodoMcpServer::new(TodoRepository::new(dir.path().join("db.json"))).unwrap();
        (dir, server)
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new("session", RequestId::Number(1))
    }

    #[test]
    fn test_registers_all_tools() {
        let (_dir, server) = create_test_server();
        let names: Vec<_> = server
            .operations()
            .list()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "createTodo",
                "listTodos",
                "updateTodo",
                "deleteTodo",
                "summarizeTodos"
            ]
        );
    }

    #[test]
    fn test_initialize_negotiates_version() {
        let (_dir, server) = create_test_server();
        let params: InitializeParams = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "1.0"}
        }))
        .unwrap();
        let result = serde_json::to_value(server.initialize(&params)).unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "todo-mcp");
        assert!(result["capabilities"].get("tools").is_some());
        assert!(result["capabilities"].get("logging").is_some());
    }

    #[tokio::test]
    async fn test_tools_call_through_registry() {
        let (_dir, server) = create_test_server();
        let created = server
            .handle_request(
                "tools/call",
                Some(json!({"name": "createTodo", "arguments": {"title": "Buy milk"}})),
                ctx(),
            )
            .await
            .unwrap();
        assert_eq!(created["structuredContent"]["title"], "Buy milk");
        assert_eq!(created["structuredContent"]["completed"], false);

        let listed = server
            .handle_request(
                "tools/call",
                Some(json!({"name": "listTodos", "arguments": {"completed": true}})),
                ctx(),
            )
            .await
            .unwrap();
        assert_eq!(listed["structuredContent"]["total"], 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let (_dir, server) = create_test_server();
        let err = server
            .handle_request("tools/call", Some(json!({"name": "frobnicate"})), ctx())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::UnknownOperation);

        let err = server
            .handle_request("sampling/createMessage", None, ctx())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::UnknownOperation);
        assert!(server.repository().load().await.unwrap().todos.is_empty());
    }

    #[tokio::test]
    async fn test_resources_and_prompts() {
        let (_dir, server) = create_test_server();

        let listed = server
            .handle_request("resources/list", None, ctx())
            .await
            .unwrap();
        assert_eq!(listed["resources"].as_array().unwrap().len(), 4);

        let templates = server
            .handle_request("resources/templates/list", None, ctx())
            .await
            .unwrap();
        assert_eq!(
            templates["resourceTemplates"][0]["uriTemplate"],
            TODOS_TEMPLATE
        );

        let read = server
            .handle_request(
                "resources/read",
                Some(json!({"uri": "todos://incomplete"})),
                ctx(),
            )
            .await
            .unwrap();
        assert_eq!(read["contents"][0]["text"], "[]");

        let missing = server
            .handle_request("resources/read", Some(json!({"uri": "notes://x"})), ctx())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::of(&missing), ErrorKind::NotFound);

        let prompt = server
            .handle_request("prompts/get", Some(json!({"name": SUMMARIZE_PROMPT})), ctx())
            .await
            .unwrap();
        assert_eq!(
            prompt["messages"][1]["content"]["text"],
            "You currently have no todos."
        );
    }
}

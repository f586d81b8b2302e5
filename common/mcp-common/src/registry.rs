//! Operation and prompt registries
//!
//! Registries are filled once at startup and read concurrently afterwards.
//! Registration is where duplicates are caught; invocation is where input
//! contracts are enforced, before any handler code runs.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde::Serialize;
use serde_json::{json, Value};

use crate::contract::{InputContract, OutputContract, ValidatedArguments};
use crate::error::{invalid_params, unknown_operation, McpResult};
use crate::jsonrpc::{LogLevel, RequestId};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("{kind} `{name}` is already registered")]
    Duplicate { kind: &'static str, name: String },

    #[error("invalid {kind} `{name}`: {reason}")]
    Invalid {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

// ============================================================================
// Invocation context
// ============================================================================

/// Outbound channel for notifications raised while a request runs
pub trait NotificationSink: Send + Sync {
    fn send_log(&self, level: LogLevel, logger: &str, data: Value);
}

/// What a handler knows about the request it is serving
#[derive(Clone)]
pub struct InvocationContext {
    pub session_id: String,
    pub request_id: RequestId,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("session_id", &self.session_id)
            .field("request_id", &self.request_id)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl InvocationContext {
    pub fn new(session_id: impl Into<String>, request_id: RequestId) -> Self {
        Self {
            session_id: session_id.into(),
            request_id,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Send a log notification to the client. Silently dropped without a sink.
    pub fn log(&self, level: LogLevel, logger: &str, message: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink.send_log(level, logger, Value::String(message.into()));
        }
    }
}

// ============================================================================
// Operations (tools)
// ============================================================================

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(
        &self,
        operation: &str,
        args: ValidatedArguments,
        ctx: InvocationContext,
    ) -> McpResult<CallToolResult>;
}

pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ValidatedArguments, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<CallToolResult>> + Send,
{
    async fn handle(
        &self,
        _operation: &str,
        args: ValidatedArguments,
        ctx: InvocationContext,
    ) -> McpResult<CallToolResult> {
        (self.0)(args, ctx).await
    }
}

/// Adapt an async closure into a [`ToolHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ValidatedArguments, InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Discovery entry for `tools/list`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

struct Operation {
    name: String,
    description: String,
    input: InputContract,
    output: Option<OutputContract>,
    handler: Arc<dyn ToolHandler>,
}

/// Named operations, kept in registration order
#[derive(Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_operation(
        &mut self,
        name: &str,
        description: &str,
        input: InputContract,
        output: Option<OutputContract>,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::Invalid {
                kind: "operation",
                name: name.to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        if self.contains(name) {
            return Err(RegistryError::Duplicate {
                kind: "operation",
                name: name.to_string(),
            });
        }
        self.operations.push(Operation {
            name: name.to_string(),
            description: description.to_string(),
            input,
            output,
            handler,
        });
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.operations
            .iter()
            .map(|op| ToolDescriptor {
                name: op.name.clone(),
                description: op.description.clone(),
                input_schema: op.input.to_json_schema(),
                output_schema: op.output.as_ref().map(|o| o.schema().clone()),
            })
            .collect()
    }

    /// Resolve, validate and run an operation.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: InvocationContext,
    ) -> McpResult<CallToolResult> {
        let op = self.find(name).ok_or_else(|| unknown_operation(name))?;
        let args = op.input.validate(arguments).map_err(McpError::from)?;

        tracing::info!(
            operation = %op.name,
            session_id = %ctx.session_id,
            request_id = %ctx.request_id,
            "Invoking operation"
        );
        op.handler.handle(&op.name, args, ctx).await
    }
}

// ============================================================================
// Prompts
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Value,
}

impl PromptMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: json!({ "type": "text", "text": text.into() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn render(&self, arguments: HashMap<String, String>) -> McpResult<PromptResult>;
}

struct Prompt {
    descriptor: PromptDescriptor,
    handler: Arc<dyn PromptHandler>,
}

#[derive(Default)]
pub struct PromptRegistry {
    prompts: Vec<Prompt>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_prompt(
        &mut self,
        descriptor: PromptDescriptor,
        handler: Arc<dyn PromptHandler>,
    ) -> Result<(), RegistryError> {
        if self.find(&descriptor.name).is_some() {
            return Err(RegistryError::Duplicate {
                kind: "prompt",
                name: descriptor.name,
            });
        }
        self.prompts.push(Prompt {
            descriptor,
            handler,
        });
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.descriptor.name == name)
    }

    pub fn list(&self) -> Vec<PromptDescriptor> {
        self.prompts.iter().map(|p| p.descriptor.clone()).collect()
    }

    /// Render a prompt. Argument values must be strings.
    pub async fn get(&self, name: &str, arguments: Option<Value>) -> McpResult<PromptResult> {
        let prompt = self
            .find(name)
            .ok_or_else(|| invalid_params(format!("Unknown prompt: {}", name)))?;

        let mut args = HashMap::new();
        match arguments {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (key, value) in map {
                    let Value::String(s) = value else {
                        return Err(invalid_params(format!(
                            "Prompt argument `{}` must be a string",
                            key
                        )));
                    };
                    args.insert(key, s);
                }
            }
            Some(_) => return Err(invalid_params("Prompt arguments must be an object")),
        }

        if let Some(missing) = prompt
            .descriptor
            .arguments
            .iter()
            .find(|a| a.required && !args.contains_key(&a.name))
        {
            return Err(invalid_params(format!(
                "Missing required prompt argument `{}`",
                missing.name
            )));
        }

        prompt.handler.render(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FieldType;
    use crate::error::ErrorKind;
    use rmcp::model::Content;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn echo_handler() -> Arc<dyn ToolHandler> {
        handler_fn(|args: ValidatedArguments, _ctx| async move {
            let title = args
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(CallToolResult::success(vec![Content::text(title)]))
        })
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new("session-1", RequestId::Number(1))
    }

    fn title_contract() -> InputContract {
        InputContract::new().required("title", FieldType::String, "")
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = OperationRegistry::new();
        registry
            .register_operation("createTodo", "", title_contract(), None, echo_handler())
            .unwrap();
        let err = registry
            .register_operation("createTodo", "", title_contract(), None, echo_handler())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: "operation",
                name: "createTodo".into()
            }
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("createTodo"));
        assert!(!registry.contains("deleteTodo"));
    }

    #[test]
    fn test_unknown_operation() {
        let registry = OperationRegistry::new();
        let err = tokio_test::block_on(registry.invoke("nope", None, ctx())).unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::UnknownOperation);
    }

    #[test]
    fn test_invalid_arguments_never_reach_handler() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let handler = handler_fn(move |_args, _ctx| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(CallToolResult::success(vec![Content::text("ran")]))
            }
        });

        let mut registry = OperationRegistry::new();
        registry
            .register_operation("createTodo", "", title_contract(), None, handler)
            .unwrap();

        let err = tokio_test::block_on(registry.invoke(
            "createTodo",
            Some(json!({"title": 42})),
            ctx(),
        ))
        .unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::InvalidArguments);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invoke_runs_handler() {
        let mut registry = OperationRegistry::new();
        registry
            .register_operation("echo", "Echo a title", title_contract(), None, echo_handler())
            .unwrap();

        let result = registry
            .invoke("echo", Some(json!({"title": "Buy milk"})), ctx())
            .await
            .unwrap();
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["content"][0]["text"], "Buy milk");
    }

    #[test]
    fn test_list_preserves_order_and_schemas() {
        let mut registry = OperationRegistry::new();
        for name in ["b", "a", "c"] {
            registry
                .register_operation(name, "", title_contract(), None, echo_handler())
                .unwrap();
        }
        let listed = registry.list();
        let names: Vec<_> = listed.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(listed[0].input_schema["required"], json!(["title"]));

        let wire = serde_json::to_value(&listed[0]).unwrap();
        assert!(wire.get("inputSchema").is_some());
        assert!(wire.get("outputSchema").is_none());
    }

    struct Greeting;

    #[async_trait]
    impl PromptHandler for Greeting {
        async fn render(&self, arguments: HashMap<String, String>) -> McpResult<PromptResult> {
            Ok(PromptResult {
                description: None,
                messages: vec![PromptMessage::text(
                    Role::User,
                    format!("Hello {}", arguments["name"]),
                )],
            })
        }
    }

    fn greeting_registry() -> PromptRegistry {
        let mut prompts = PromptRegistry::new();
        prompts
            .register_prompt(
                PromptDescriptor {
                    name: "greet".into(),
                    description: None,
                    arguments: vec![PromptArgument {
                        name: "name".into(),
                        description: None,
                        required: true,
                    }],
                },
                Arc::new(Greeting),
            )
            .unwrap();
        prompts
    }

    #[tokio::test]
    async fn test_prompt_requires_declared_arguments() {
        let prompts = greeting_registry();
        let err = prompts.get("greet", None).await.unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::InvalidArguments);

        let ok = prompts
            .get("greet", Some(json!({"name": "Ada"})))
            .await
            .unwrap();
        assert_eq!(ok.messages[0].content["text"], "Hello Ada");
        assert_eq!(serde_json::to_value(ok.messages[0].role).unwrap(), "user");
    }

    #[test]
    fn test_duplicate_prompt_fails() {
        let mut prompts = greeting_registry();
        let err = prompts
            .register_prompt(
                PromptDescriptor {
                    name: "greet".into(),
                    description: None,
                    arguments: vec![],
                },
                Arc::new(Greeting),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { kind: "prompt", .. }));
    }
}

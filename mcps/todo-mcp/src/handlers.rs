//! Handler implementations for todo-mcp tools
//!
//! Each handler converts tool params to repository calls, reports progress to
//! the client as a log notification, and renders the result as a
//! `CallToolResult` carrying both a human-readable text and the structured
//! value.

use mcp_common::{
    structured_success, CallToolResult, InvocationContext, LogLevel, McpError, ResultExt,
};

use crate::params::*;
use crate::repository::TodoRepository;
use crate::types::{Todo, TodoFilter, TodoListResponse, TodoPatch, TodoSummary};

/// Logger name attached to client-facing log notifications
pub const LOGGER: &str = "todo-mcp";

// ============================================================================
// CRUD Operations
// ============================================================================

pub async fn create_todo(
    repo: &TodoRepository,
    params: CreateTodoParams,
    ctx: &InvocationContext,
) -> Result<CallToolResult, McpError> {
    let todo = repo.create(&params.title, params.completed).await.to_mcp_err()?;

    tracing::info!(todo_id = %todo.id, session_id = %ctx.session_id, "Created todo");
    ctx.log(LogLevel::Info, LOGGER, format!("Created todo {}", todo.id));

    structured_success(
        format!("Created todo \"{}\" ({})", todo.title, todo.status_label()),
        &todo,
    )
}

pub async fn list_todos(
    repo: &TodoRepository,
    params: ListTodosParams,
    ctx: &InvocationContext,
) -> Result<CallToolResult, McpError> {
    let filter = TodoFilter::from_completed(params.completed);
    let todos = repo.list(filter).await.to_mcp_err()?;

    ctx.log(
        LogLevel::Debug,
        LOGGER,
        format!("Listed {} {} todo(s)", todos.len(), filter.name()),
    );

    let text = render_list(&todos, filter);
    let response = TodoListResponse {
        total: todos.len(),
        todos,
    };
    structured_success(text, &response)
}

pub async fn update_todo(
    repo: &TodoRepository,
    params: UpdateTodoParams,
    ctx: &InvocationContext,
) -> Result<CallToolResult, McpError> {
    let patch = TodoPatch {
        title: params.title,
        completed: params.completed,
    };
    let todo = repo.update(&params.id, patch).await.to_mcp_err()?;

    tracing::info!(todo_id = %todo.id, session_id = %ctx.session_id, "Updated todo");
    ctx.log(LogLevel::Info, LOGGER, format!("Updated todo {}", todo.id));

    structured_success(
        format!("Updated todo: {} ({})", todo.title, todo.status_label()),
        &todo,
    )
}

pub async fn delete_todo(
    repo: &TodoRepository,
    params: DeleteTodoParams,
    ctx: &InvocationContext,
) -> Result<CallToolResult, McpError> {
    let outcome = repo.delete(&params.id).await.to_mcp_err()?;

    let text = match &outcome.deleted_todo {
        Some(todo) => {
            tracing::info!(todo_id = %todo.id, session_id = %ctx.session_id, "Deleted todo");
            ctx.log(LogLevel::Info, LOGGER, format!("Deleted todo {}", todo.id));
            format!("Todo \"{}\" has been deleted", todo.title)
        }
        None => format!("No todo found with ID {}", params.id),
    };

    structured_success(text, &outcome)
}

// ============================================================================
// Summaries
// ============================================================================

pub async fn summarize_todos(
    repo: &TodoRepository,
    params: SummarizeTodosParams,
    ctx: &InvocationContext,
) -> Result<CallToolResult, McpError> {
    let summary = build_summary(repo, TodoFilter::from_completed(params.completed)).await?;
    ctx.log(
        LogLevel::Debug,
        LOGGER,
        format!("Summarized {} todo(s)", summary.todos_count),
    );
    structured_success(summary.summary_text.clone(), &summary)
}

/// Summary shared by the summarizeTodos tool and the summarize-todos prompt
pub async fn build_summary(
    repo: &TodoRepository,
    filter: TodoFilter,
) -> Result<TodoSummary, McpError> {
    let todos = repo.list(filter).await.to_mcp_err()?;
    Ok(summarize(&todos, filter))
}

pub fn summarize(todos: &[Todo], filter: TodoFilter) -> TodoSummary {
    let completed_count = todos.iter().filter(|t| t.completed).count();
    let incomplete_count = todos.len() - completed_count;
    let titles = |items: &[Todo]| {
        items
            .iter()
            .map(|t| t.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let summary_text = if todos.is_empty() {
        match filter.qualifier() {
            Some(q) => format!("You currently have no {} todos.", q),
            None => "You currently have no todos.".to_string(),
        }
    } else {
        match filter {
            TodoFilter::Completed => format!(
                "You have {} completed todo(s). These include: {}.",
                completed_count,
                titles(todos)
            ),
            TodoFilter::Incomplete => format!(
                "You have {} incomplete todo(s). These include: {}.",
                incomplete_count,
                titles(todos)
            ),
            TodoFilter::All => format!(
                "You have a total of {} todo(s). {} are completed and {} are incomplete. Here are a few: {}{}.",
                todos.len(),
                completed_count,
                incomplete_count,
                titles(&todos[..todos.len().min(3)]),
                if todos.len() > 3 { "..." } else { "" }
            ),
        }
    };

    TodoSummary {
        summary_text,
        todos_count: todos.len(),
        completed_count,
        incomplete_count,
    }
}

fn render_list(todos: &[Todo], filter: TodoFilter) -> String {
    if todos.is_empty() {
        return match filter.qualifier() {
            Some(q) => format!("You don't have any {} todos yet.", q),
            None => "You don't have any todos yet.".to_string(),
        };
    }

    let lines: Vec<String> = todos
        .iter()
        .map(|todo| {
            format!(
                "• {} ({}) - Created: {}",
                todo.title,
                if todo.completed { "✓" } else { "□" },
                todo.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            )
        })
        .collect();
    format!("Here are your todos:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mcp_common::{ErrorKind, RequestId};
    use serde_json::Value;

    fn todo(title: &str, completed: bool) -> Todo {
        let now = Utc::now();
        Todo {
            id: format!("id-{}", title),
            title: title.to_string(),
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new("session", RequestId::Number(1))
    }

    fn text_of(result: &CallToolResult) -> String {
        let wire = serde_json::to_value(result).unwrap();
        wire["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_summary_of_all_todos() {
        let todos = vec![
            todo("a", true),
            todo("b", false),
            todo("c", false),
            todo("d", true),
        ];
        let summary = summarize(&todos, TodoFilter::All);
        assert_eq!(summary.todos_count, 4);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.incomplete_count, 2);
        assert_eq!(
            summary.summary_text,
            "You have a total of 4 todo(s). 2 are completed and 2 are incomplete. Here are a few: a, b, c...."
        );
    }

    #[test]
    fn test_summary_with_filter() {
        let done = vec![todo("Pay bills", true), todo("Walk the dog", true)];
        let summary = summarize(&done, TodoFilter::Completed);
        assert_eq!(
            summary.summary_text,
            "You have 2 completed todo(s). These include: Pay bills, Walk the dog."
        );

        let empty = summarize(&[], TodoFilter::Incomplete);
        assert_eq!(empty.summary_text, "You currently have no incomplete todos.");
        assert_eq!(empty.todos_count, 0);
    }

    #[test]
    fn test_empty_list_wording() {
        assert_eq!(
            render_list(&[], TodoFilter::All),
            "You don't have any todos yet."
        );
        assert_eq!(
            render_list(&[], TodoFilter::Completed),
            "You don't have any completed todos yet."
        );
        assert!(render_list(&[todo("x", true)], TodoFilter::All).starts_with("Here are your todos:\n• x (✓)"));
    }

    #[tokio::test]
    async fn test_handlers_render_text_and_structured_content() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TodoRepository::new(dir.path().join("db.json"));

        let created = create_todo(
            &repo,
            CreateTodoParams {
                title: "Buy milk".into(),
                completed: false,
            },
            &ctx(),
        )
        .await
        .unwrap();
        assert_eq!(text_of(&created), "Created todo \"Buy milk\" (not completed)");
        let id = created.structured_content.as_ref().unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let listed = list_todos(&repo, ListTodosParams::default(), &ctx())
            .await
            .unwrap();
        let structured = listed.structured_content.unwrap();
        assert_eq!(structured["total"], 1);
        assert_eq!(structured["todos"][0]["title"], "Buy milk");

        let deleted = delete_todo(&repo, DeleteTodoParams { id: id.clone() }, &ctx())
            .await
            .unwrap();
        assert_eq!(text_of(&deleted), "Todo \"Buy milk\" has been deleted");

        let again = delete_todo(&repo, DeleteTodoParams { id }, &ctx())
            .await
            .unwrap();
        let structured = again.structured_content.unwrap();
        assert_eq!(structured["success"], Value::Bool(false));
        assert!(structured.get("deletedTodo").is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_todo_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TodoRepository::new(dir.path().join("db.json"));

        let err = update_todo(
            &repo,
            UpdateTodoParams {
                id: "nope".into(),
                title: None,
                completed: Some(true),
            },
            &ctx(),
        )
        .await
        .unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::NotFound);
    }
}

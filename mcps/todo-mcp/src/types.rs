//! Type definitions for todo-mcp

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Title stored when a todo is created with an empty one
pub const UNTITLED_TODO: &str = "Untitled Todo";

/// Todo representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "not completed"
        }
    }
}

/// On-disk document: the whole store is one JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoDocument {
    #[serde(default)]
    pub todos: Vec<Todo>,
}

/// Response for the list_todos tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
    pub total: usize,
}

/// Response for the delete_todo tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_todo: Option<Todo>,
}

/// Response for the summarize_todos tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoSummary {
    pub summary_text: String,
    pub todos_count: usize,
    pub completed_count: usize,
    pub incomplete_count: usize,
}

/// Completion-status filter shared by listing, summaries and resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl TodoFilter {
    pub fn from_completed(completed: Option<bool>) -> Self {
        match completed {
            None => TodoFilter::All,
            Some(true) => TodoFilter::Completed,
            Some(false) => TodoFilter::Incomplete,
        }
    }

    /// Parse the `{filter}` segment of a `todos://` URI
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(TodoFilter::All),
            "completed" => Some(TodoFilter::Completed),
            "incomplete" => Some(TodoFilter::Incomplete),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TodoFilter::All => "all",
            TodoFilter::Completed => "completed",
            TodoFilter::Incomplete => "incomplete",
        }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Completed => todo.completed,
            TodoFilter::Incomplete => !todo.completed,
        }
    }

    /// Adjective used in summary and empty-list wording
    pub fn qualifier(&self) -> Option<&'static str> {
        match self {
            TodoFilter::All => None,
            TodoFilter::Completed => Some("completed"),
            TodoFilter::Incomplete => Some("incomplete"),
        }
    }
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

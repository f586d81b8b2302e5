//! Parameter definitions for todo-mcp tools
//!
//! Arguments are checked against each tool's input contract first; these
//! structs are the typed view handlers decode the checked map into.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateTodoParams {
    /// Task title
    pub title: String,
    /// Task completion status
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTodosParams {
    /// Filter by completion status
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTodoParams {
    /// Todo ID to update
    pub id: String,
    /// New title for the todo
    #[serde(default)]
    pub title: Option<String>,
    /// New completion status
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteTodoParams {
    /// Todo ID to delete
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeTodosParams {
    /// Restrict the summary to completed (true) or incomplete (false) todos
    #[serde(default)]
    pub completed: Option<bool>,
}

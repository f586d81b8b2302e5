//! Result helpers for MCP tool responses
//!
//! Tool results are tagged payloads: a human-readable rendering in `content`
//! and, for typed results, the structured value in `structuredContent`.

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Create a successful response with a custom text rendering plus the
/// structured value
///
/// ```rust,ignore
/// use mcp_common::structured_success;
///
/// structured_success(format!("Created todo \"{}\"", todo.title), &todo)
/// ```
pub fn structured_success<T: Serialize>(
    text: impl Into<String>,
    data: &T,
) -> Result<CallToolResult, McpError> {
    let value = serde_json::to_value(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    let mut result = CallToolResult::success(vec![Content::text(text.into())]);
    result.structured_content = Some(value);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_structured_success_keeps_text_and_value() {
        let data = TestData {
            name: "milk".to_string(),
            value: 1,
        };
        let result = structured_success("Bought milk", &data).unwrap();
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["content"][0]["text"], "Bought milk");
        assert_eq!(wire["structuredContent"]["name"], "milk");
    }
}

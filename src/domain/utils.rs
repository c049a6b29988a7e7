//! Domain-specific shared validations and result builders

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::schema::{
    CallToolResult, ContentBlock, ReadResourceContent, ReadResourceResult, Resource, TextContent,
    TextResourceContents,
};
use serde_json::{Map, Value};

use crate::errors::AppError;

pub fn normalize_required(field: &str, value: String) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(
            "missing_field",
            format!("{field} must not be empty"),
        ));
    }

    Ok(trimmed.to_string())
}

/// Like [`normalize_required`] but keeps surrounding whitespace, which is
/// significant for message triggers and responses.
pub fn require_text(field: &str, value: String) -> Result<String, AppError> {
    normalize_required(field, value.clone())?;
    Ok(value)
}

pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn generated_at_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn tool_result(
    text: impl Into<String>,
    structured_content: Map<String, Value>,
) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text.into(), None, None))],
        is_error: None,
        meta: None,
        structured_content: Some(structured_content),
    }
}

/// A tool-level failure the client should see as a result, not a protocol error.
pub fn tool_error(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text.into(), None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

pub fn json_resource(uri: &str, name: &str, description: &str) -> Resource {
    Resource {
        annotations: None,
        description: Some(description.to_string()),
        icons: vec![],
        meta: None,
        mime_type: Some("application/json".to_string()),
        name: name.to_string(),
        size: None,
        title: None,
        uri: uri.to_string(),
    }
}

pub fn json_resource_contents(uri: &str, content: &Value) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some("application/json".to_string()),
            text: content.to_string(),
            uri: uri.to_string(),
        })],
        meta: None,
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Conversation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One unit of a message.  The serialized form is the Anthropic wire shape,
/// which the OpenAI adapter rewrites on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolResult { tool_use_id: tool_use_id.into(), content: content.into(), is_error }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: vec![ContentBlock::text(text)] }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self { role: Role::Assistant, content }
    }

    /// A user turn carrying the answers to the previous assistant turn's
    /// tool calls.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self { role: Role::User, content: results }
    }

    /// Concatenated text blocks, `None` when the message has none.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }
}

// ─── Request / response ──────────────────────────────────────────────────────

/// Tool description sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    /// `{type: "object", properties, required}`
    pub input_schema: Value,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider-independent reply: ordered `text` and `tool_use` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::text(text)], stop_reason: Some("end_turn".into()), ..Self::default() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            content: vec![ContentBlock::ToolUse { id: id.into(), name: name.into(), input }],
            stop_reason: Some("tool_use".into()),
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn content_block_serializes_with_type_tag() {
        let b = ContentBlock::ToolUse { id: "t1".into(), name: "ls".into(), input: json!({"path": "."}) };
        assert_eq!(
            serde_json::to_value(&b).unwrap(),
            json!({"type": "tool_use", "id": "t1", "name": "ls", "input": {"path": "."}})
        );
    }

    #[test]
    fn tool_result_omits_is_error_when_false() {
        let ok = serde_json::to_value(ContentBlock::tool_result("t1", "fine", false)).unwrap();
        assert!(ok.get("is_error").is_none());
        let bad = serde_json::to_value(ContentBlock::tool_result("t1", "error: x", true)).unwrap();
        assert_eq!(bad["is_error"], json!(true));
    }

    #[test]
    fn message_text_joins_text_blocks_only() {
        let m = Message::assistant(vec![
            ContentBlock::text("a"),
            ContentBlock::ToolUse { id: "1".into(), name: "ls".into(), input: json!({}) },
            ContentBlock::text("b"),
        ]);
        assert_eq!(m.text().as_deref(), Some("ab"));
        assert!(Message::tool_results(vec![ContentBlock::tool_result("1", "x", false)]).text().is_none());
    }

    #[test]
    fn response_reports_tool_calls() {
        assert!(!ModelResponse::text("hi").has_tool_calls());
        assert!(ModelResponse::tool_use("1", "ls", json!({})).has_tool_calls());
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::Value;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim)
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// Text handed back to the model as the call's `tool_result`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub call_id: String,
    pub content: String,
    /// The tool failed non-fatally; `content` starts with `error:`.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), is_error: false }
    }

    /// Error result.  The `error: ` prefix is added when missing.
    pub fn err(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let content = if msg.starts_with("error:") { msg } else { format!("error: {msg}") };
        Self { call_id: call_id.into(), content, is_error: true }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;
    /// Failures are reported through [`ToolOutput::err`], never as a panic.
    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

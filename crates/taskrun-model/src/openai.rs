// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use taskrun_config::ProviderConfig;
use tracing::{debug, warn};

use crate::{CompletionRequest, ContentBlock, Message, ModelError, ModelResponse, Role, Usage};

const PROVIDER: &str = "openai";

pub struct OpenAiProvider {
    model: String,
    api_key: Option<String>,
    endpoint: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(cfg: &ProviderConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            api_key: cfg.resolve_api_key(),
            endpoint: cfg.endpoint(),
            max_tokens: cfg.max_tokens,
            client: reqwest::Client::new(),
        }
    }

    pub(crate) fn build_body(&self, req: &CompletionRequest) -> Value {
        let mut messages: Vec<Value> = Vec::new();
        if let Some(system) = req.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for m in &req.messages {
            push_wire_messages(&mut messages, m);
        }

        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        if let Some(max) = self.max_tokens {
            body["max_tokens"] = json!(max);
        }
        body
    }
}

/// Flatten one canonical message into chat-completions messages.
///
/// Tool answers become `role:"tool"` messages and must directly follow the
/// assistant message that issued the calls, so they are pushed before any
/// user text carried in the same turn.
fn push_wire_messages(out: &mut Vec<Value>, m: &Message) {
    match m.role {
        Role::User => {
            for block in &m.content {
                if let ContentBlock::ToolResult { tool_use_id, content, .. } = block {
                    out.push(json!({
                        "role": "tool",
                        "tool_call_id": tool_use_id,
                        "content": content,
                    }));
                }
            }
            if let Some(text) = m.text() {
                out.push(json!({ "role": "user", "content": text }));
            }
        }
        Role::Assistant => {
            let tool_calls: Vec<Value> = m
                .content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(json!({
                        "id": id,
                        "type": "function",
                        "function": { "name": name, "arguments": input.to_string() },
                    })),
                    _ => None,
                })
                .collect();
            let mut msg = json!({ "role": "assistant", "content": m.text() });
            if !tool_calls.is_empty() {
                msg["tool_calls"] = json!(tool_calls);
            }
            out.push(msg);
        }
    }
}

// ─── Response wire format ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

pub(crate) fn parse_response(body: Value) -> Result<ModelResponse, ModelError> {
    let wire: WireResponse =
        serde_json::from_value(body).map_err(|e| ModelError::decode(PROVIDER, e.to_string()))?;
    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::decode(PROVIDER, "response has no choices"))?;

    let mut content = Vec::new();
    if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
        content.push(ContentBlock::Text { text });
    }
    for call in choice.message.tool_calls {
        let input = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                warn!(
                    tool = %call.function.name,
                    error = %e,
                    "tool call arguments are not valid JSON; substituting {{}}"
                );
                json!({})
            })
        };
        content.push(ContentBlock::ToolUse { id: call.id, name: call.function.name, input });
    }

    let usage = wire
        .usage
        .map(|u| Usage { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens })
        .unwrap_or_default();

    Ok(ModelResponse { content, stop_reason: choice.finish_reason, usage })
}

#[async_trait]
impl crate::ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ModelResponse, ModelError> {
        let key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey { provider: PROVIDER })?;
        let body = self.build_body(&req);

        debug!(model = %self.model, messages = req.messages.len(), "sending openai request");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ModelError::Transport { provider: PROVIDER, source })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status { provider: PROVIDER, status: status.as_u16(), body });
        }

        let json: Value = resp.json().await.map_err(|e| ModelError::decode(PROVIDER, e.to_string()))?;
        let parsed = parse_response(json)?;
        debug!(blocks = parsed.content.len(), stop_reason = ?parsed.stop_reason, "openai response");
        Ok(parsed)
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use taskrun_config::ProviderConfig;
use tracing::debug;

use crate::{CompletionRequest, ContentBlock, ModelError, ModelResponse, Usage};

const PROVIDER: &str = "anthropic";

pub struct AnthropicProvider {
    model: String,
    api_key: Option<String>,
    endpoint: String,
    api_version: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(cfg: &ProviderConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            api_key: cfg.resolve_api_key(),
            endpoint: cfg.endpoint(),
            api_version: cfg.api_version().to_string(),
            max_tokens: cfg.max_tokens.unwrap_or(4096),
            client: reqwest::Client::new(),
        }
    }

    /// Request body for `/v1/messages`.  Canonical content blocks already
    /// serialize to this wire shape.
    pub(crate) fn build_body(&self, req: &CompletionRequest) -> Value {
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.input_schema,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": req.messages,
        });
        if let Some(system) = req.system.as_deref().filter(|s| !s.is_empty()) {
            body["system"] = json!(system);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }
}

// ─── Response wire format ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    content: Vec<WireBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text { text: String },
    ToolUse { id: String, name: String, #[serde(default)] input: Value },
    /// `thinking`, `redacted_thinking`, server tool blocks
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

pub(crate) fn parse_response(body: Value) -> Result<ModelResponse, ModelError> {
    let wire: WireResponse =
        serde_json::from_value(body).map_err(|e| ModelError::decode(PROVIDER, e.to_string()))?;

    let content = wire
        .content
        .into_iter()
        .filter_map(|b| match b {
            // The API rejects empty text blocks when they are sent back.
            WireBlock::Text { text } if text.is_empty() => None,
            WireBlock::Text { text } => Some(ContentBlock::Text { text }),
            WireBlock::ToolUse { id, name, input } => {
                let input = if input.is_null() { json!({}) } else { input };
                Some(ContentBlock::ToolUse { id, name, input })
            }
            WireBlock::Other => None,
        })
        .collect();

    Ok(ModelResponse {
        content,
        stop_reason: wire.stop_reason,
        usage: Usage { input_tokens: wire.usage.input_tokens, output_tokens: wire.usage.output_tokens },
    })
}

#[async_trait]
impl crate::ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ModelResponse, ModelError> {
        let key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey { provider: PROVIDER })?;
        let body = self.build_body(&req);

        debug!(model = %self.model, messages = req.messages.len(), "sending anthropic request");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", key)
            .header("anthropic-version", &self.api_version)
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
        debug!(
            blocks = parsed.content.len(),
            stop_reason = ?parsed.stop_reason,
            output_tokens = parsed.usage.output_tokens,
            "anthropic response"
        );
        Ok(parsed)
    }
}

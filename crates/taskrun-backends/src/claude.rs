// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Claude Code CLI (`claude -p --output-format stream-json`).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use taskrun_config::CliBackendConfig;
use taskrun_core::{Backend, EventSink, StreamEvent, TaskRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{run_cli, CliCommand, LineDecoder};

/// Model that is served through the z.ai Anthropic-compatible endpoint.
const GLM_MODEL: &str = "glm-4.6";
const GLM_BASE_URL: &str = "https://api.z.ai/api/anthropic";
const GLM_TIMEOUT_MS: &str = "3000000";
/// Where the z.ai token is read from unless `env` sets it explicitly.
const GLM_TOKEN_ENV: &str = "ZAI_API_KEY";

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeLine {
    System {
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        message: ClaudeMessage,
    },
    User {
        message: ClaudeMessage,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: Value,
    },
    Result {
        #[serde(default)]
        result: String,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeMessage {
    #[serde(default)]
    content: MessageContent,
}

/// User echoes sometimes carry a bare string instead of blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Blocks(Vec<ClaudeBlock>),
    Text(String),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(other)]
    Other,
}

/// Tool output arrives as a string or as a list of text blocks.
fn flatten_content(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ClaudeDecoder {
    /// tool_use id → tool name, so results can be labelled.
    tools: HashMap<String, String>,
}

impl ClaudeDecoder {
    fn tool_result(&self, id: Option<&str>, content: &Value) -> StreamEvent {
        let tool = id.and_then(|id| self.tools.get(id)).cloned();
        StreamEvent::tool_result(flatten_content(content), tool)
    }
}

impl LineDecoder for ClaudeDecoder {
    type Line = ClaudeLine;

    fn on_line(&mut self, line: ClaudeLine) -> Vec<StreamEvent> {
        match line {
            ClaudeLine::System { session_id } => session_id.map(StreamEvent::session).into_iter().collect(),
            ClaudeLine::Assistant { message } => {
                let MessageContent::Blocks(blocks) = message.content else {
                    return vec![];
                };
                let mut out = Vec::new();
                for block in blocks {
                    match block {
                        ClaudeBlock::Text { text } if !text.is_empty() => out.push(StreamEvent::text(text)),
                        ClaudeBlock::ToolUse { id, name, input } => {
                            out.push(StreamEvent::tool(name.clone(), input.to_string()));
                            self.tools.insert(id, name);
                        }
                        _ => {}
                    }
                }
                out
            }
            ClaudeLine::User { message } => match message.content {
                MessageContent::Blocks(blocks) => blocks
                    .iter()
                    .filter_map(|b| match b {
                        ClaudeBlock::ToolResult { tool_use_id, content } => {
                            Some(self.tool_result(Some(tool_use_id), content))
                        }
                        _ => None,
                    })
                    .collect(),
                MessageContent::Text(_) => vec![],
            },
            ClaudeLine::ToolResult { tool_use_id, content } => {
                vec![self.tool_result(tool_use_id.as_deref(), &content)]
            }
            ClaudeLine::Result { result, is_error } => {
                if is_error {
                    vec![StreamEvent::error(result.clone()), StreamEvent::done(result)]
                } else {
                    vec![StreamEvent::done(result)]
                }
            }
            ClaudeLine::Unknown => {
                debug!("skipping unrecognised claude line");
                vec![]
            }
        }
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

pub struct ClaudeBackend {
    config: CliBackendConfig,
}

impl ClaudeBackend {
    pub fn new(config: CliBackendConfig) -> Self {
        Self { config }
    }

    /// The child invocation for `task`.
    pub fn command(&self, task: &TaskRequest) -> CliCommand {
        let mut args = vec![
            "-p".to_string(),
            task.prompt.clone(),
            "--output-format".into(),
            "stream-json".into(),
            "--verbose".into(),
        ];
        if let Some(model) = &self.config.model {
            args.push("--model".into());
            args.push(model.clone());
        }
        args.extend(self.config.extra_args.iter().cloned());

        let mut env: Vec<(String, String)> =
            self.config.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.sort();
        if self.config.model.as_deref() == Some(GLM_MODEL) {
            let token = self
                .config
                .env
                .get("ANTHROPIC_AUTH_TOKEN")
                .cloned()
                .or_else(|| std::env::var(GLM_TOKEN_ENV).ok());
            env.retain(|(k, _)| !matches!(k.as_str(), "ANTHROPIC_BASE_URL" | "ANTHROPIC_AUTH_TOKEN" | "API_TIMEOUT_MS"));
            env.push(("ANTHROPIC_BASE_URL".into(), GLM_BASE_URL.into()));
            match token {
                Some(t) => env.push(("ANTHROPIC_AUTH_TOKEN".into(), t)),
                None => warn!("{GLM_MODEL} selected but {GLM_TOKEN_ENV} is not set"),
            }
            env.push(("API_TIMEOUT_MS".into(), GLM_TIMEOUT_MS.into()));
        }

        CliCommand { program: self.config.binary.clone(), args, env, workdir: task.workdir.clone() }
    }
}

#[async_trait]
impl Backend for ClaudeBackend {
    fn name(&self) -> &str {
        "claude"
    }

    async fn run(&self, task: TaskRequest, sink: EventSink, cancel: CancellationToken) -> anyhow::Result<()> {
        run_cli(self.command(&task), ClaudeDecoder::default(), &sink, &cancel).await
    }
}

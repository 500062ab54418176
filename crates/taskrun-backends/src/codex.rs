// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Codex CLI (`codex exec --json`).

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use taskrun_config::CliBackendConfig;
use taskrun_core::{Backend, EventSink, StreamEvent, TaskRequest};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{run_cli, CliCommand, LineDecoder};

/// Tool name reported for `command_execution` items.
const COMMAND_TOOL: &str = "bash";

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum CodexLine {
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: String,
    },
    #[serde(rename = "item.started")]
    ItemStarted { item: CodexItem },
    #[serde(rename = "item.completed")]
    ItemCompleted { item: CodexItem },
    #[serde(rename = "turn.completed")]
    TurnCompleted {},
    #[serde(rename = "turn.failed")]
    TurnFailed {
        #[serde(default)]
        error: Option<ErrorBody>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodexItem {
    CommandExecution {
        #[serde(default)]
        id: String,
        #[serde(default)]
        command: String,
        #[serde(default)]
        aggregated_output: Option<String>,
        #[serde(default)]
        stdout: Option<String>,
        #[serde(default)]
        exit_code: Option<i32>,
    },
    AgentMessage {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default)]
pub struct CodexDecoder {
    /// Command items already announced with a `tool` event.
    started: HashSet<String>,
    last_message: String,
}

fn tool_event(command: &str) -> StreamEvent {
    StreamEvent::tool(COMMAND_TOOL, json!({ "command": command }).to_string())
}

impl LineDecoder for CodexDecoder {
    type Line = CodexLine;

    fn on_line(&mut self, line: CodexLine) -> Vec<StreamEvent> {
        match line {
            CodexLine::ThreadStarted { thread_id } => vec![StreamEvent::session(thread_id)],
            CodexLine::ItemStarted { item: CodexItem::CommandExecution { id, command, .. } } => {
                self.started.insert(id);
                vec![tool_event(&command)]
            }
            CodexLine::ItemStarted { .. } => vec![],
            CodexLine::ItemCompleted { item } => match item {
                CodexItem::CommandExecution { id, command, aggregated_output, stdout, exit_code } => {
                    let mut out = Vec::with_capacity(2);
                    if !self.started.remove(&id) {
                        out.push(tool_event(&command));
                    }
                    let mut content = aggregated_output.or(stdout).unwrap_or_default();
                    if let Some(code) = exit_code.filter(|c| *c != 0) {
                        if !content.is_empty() && !content.ends_with('\n') {
                            content.push('\n');
                        }
                        content.push_str(&format!("(exit: {code})"));
                    }
                    out.push(StreamEvent::tool_result(content, Some(COMMAND_TOOL.to_string())));
                    out
                }
                CodexItem::AgentMessage { text } => {
                    self.last_message = text.clone();
                    vec![StreamEvent::text(text)]
                }
                CodexItem::Other => vec![],
            },
            CodexLine::TurnCompleted {} => vec![StreamEvent::done(std::mem::take(&mut self.last_message))],
            CodexLine::TurnFailed { error } => {
                let msg = error.map(|e| e.message).filter(|m| !m.is_empty());
                vec![StreamEvent::error(msg.unwrap_or_else(|| "turn failed".into()))]
            }
            CodexLine::Error { message } => vec![StreamEvent::error(message)],
            CodexLine::Unknown => {
                debug!("skipping unrecognised codex line");
                vec![]
            }
        }
    }
}

pub struct CodexBackend {
    config: CliBackendConfig,
}

impl CodexBackend {
    pub fn new(config: CliBackendConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, task: &TaskRequest) -> CliCommand {
        let mut args = vec!["exec".to_string(), "--json".into(), "--skip-git-repo-check".into()];
        if let Some(model) = &self.config.model {
            args.push("--model".into());
            args.push(model.clone());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args.push(task.prompt.clone());

        let mut env: Vec<(String, String)> =
            self.config.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.sort();
        CliCommand { program: self.config.binary.clone(), args, env, workdir: task.workdir.clone() }
    }
}

#[async_trait]
impl Backend for CodexBackend {
    fn name(&self) -> &str {
        "codex"
    }

    async fn run(&self, task: TaskRequest, sink: EventSink, cancel: CancellationToken) -> anyhow::Result<()> {
        run_cli(self.command(&task), CodexDecoder::default(), &sink, &cancel).await
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use taskrun_config::AgentConfig;
use taskrun_model::{CompletionRequest, ContentBlock, Message, ModelProvider};
use taskrun_tools::{TodoItem, ToolCall};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{system_prompt, AgentError, EventSink, StreamEvent, TaskContext};

/// The native tool-calling loop.
///
/// Each turn replays the whole history to the model, runs every requested
/// tool in order and answers each `tool_use` with exactly one
/// `tool_result`.  The run ends when a turn asks for no tools; there is
/// no iteration cap here.
pub struct Agent {
    model: Arc<dyn ModelProvider>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelProvider>, config: AgentConfig) -> Self {
        Self { model, config }
    }

    /// Run `prompt` to completion and return the conversation.  Errors have
    /// already been emitted as an `error` event.
    pub async fn run(&self, ctx: &TaskContext, prompt: &str, sink: &EventSink) -> Result<Vec<Message>, AgentError> {
        let system = system_prompt(ctx.workdir(), self.config.system_prompt.as_deref());
        let tools = ctx.tools().make_schema();
        let mut todo_rx = ctx.todos().subscribe();
        let mut messages = vec![Message::user(prompt)];
        let mut final_text = String::new();
        let mut turn = 0u32;

        info!(model = %self.model.model_name(), provider = %self.model.name(), "native run started");

        loop {
            if ctx.cancel().is_cancelled() {
                info!(turn, "run cancelled");
                emit(sink, StreamEvent::error("cancelled")).await?;
                return Err(AgentError::Cancelled);
            }
            turn += 1;

            let req = CompletionRequest {
                system: Some(system.clone()),
                messages: messages.clone(),
                tools: tools.clone(),
            };
            let resp = match self.model.complete(req).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(turn, error = %e, "model call failed; aborting run");
                    emit(sink, StreamEvent::error(e.to_string())).await?;
                    return Err(e.into());
                }
            };
            debug!(turn, blocks = resp.content.len(), "model turn");

            let mut results = Vec::new();
            for block in &resp.content {
                match block {
                    ContentBlock::Text { text } => {
                        if text.is_empty() {
                            continue;
                        }
                        final_text.push_str(text);
                        emit(sink, StreamEvent::text(text.clone())).await?;
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        emit(sink, StreamEvent::tool(name.clone(), input.to_string())).await?;
                        let call = ToolCall { id: id.clone(), name: name.clone(), args: input.clone() };
                        let out = ctx.tools().execute(&call).await;
                        forward_plans(&mut todo_rx, sink).await?;
                        let shown = truncate_for_display(&out.content, self.config.display_limit);
                        emit(sink, StreamEvent::result(name.clone(), shown)).await?;
                        results.push(ContentBlock::tool_result(id.clone(), out.content, out.is_error));
                    }
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        warn!(tool_use_id = %tool_use_id, "model sent a tool_result block; ignoring");
                    }
                }
            }

            messages.push(Message::assistant(resp.content));
            if results.is_empty() {
                info!(turns = turn, "native run finished");
                emit(sink, StreamEvent::done(final_text)).await?;
                return Ok(messages);
            }
            messages.push(Message::tool_results(results));
        }
    }
}

async fn emit(sink: &EventSink, event: StreamEvent) -> Result<(), AgentError> {
    if sink.emit(event).await {
        Ok(())
    } else {
        debug!("event consumer gone; stopping run");
        Err(AgentError::SinkClosed)
    }
}

/// Surface todo list replacements as `plan` events.
async fn forward_plans(rx: &mut broadcast::Receiver<Vec<TodoItem>>, sink: &EventSink) -> Result<(), AgentError> {
    loop {
        match rx.try_recv() {
            Ok(items) => {
                let content = serde_json::to_string(&items).unwrap_or_default();
                emit(sink, StreamEvent::plan(content)).await?;
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!(skipped = n, "plan updates lagged");
            }
            Err(_) => return Ok(()),
        }
    }
}

/// First `limit` characters, with a note about what was cut.
pub(crate) fn truncate_for_display(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    format!("{head}... ({} more chars)", total - limit)
}

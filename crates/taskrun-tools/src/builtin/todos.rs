// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::schema::{object, Param};
use crate::{parse_args, TodoItem, TodoState, TodoStatus, Tool, ToolCall, ToolContext, ToolOutput};

pub struct TodosTool {
    ctx: Arc<ToolContext>,
}

impl TodosTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    todos: Vec<RawItem>,
}

/// Status stays a string here so a bad value gets a precise message.
#[derive(Deserialize)]
struct RawItem {
    content: String,
    status: String,
    #[serde(rename = "activeForm", default)]
    active_form: String,
}

#[async_trait]
impl Tool for TodosTool {
    fn name(&self) -> &str {
        "todos"
    }

    fn description(&self) -> &str {
        "Replace the task's todo list. Each item has content, status \
         (pending | in_progress | completed) and activeForm, the label shown while it is in \
         progress. Send the whole list every time."
    }

    fn parameters_schema(&self) -> Value {
        object([(
            "todos",
            Param::Schema(json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "content": { "type": "string" },
                        "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                        "activeForm": { "type": "string" }
                    },
                    "required": ["content", "status", "activeForm"]
                }
            })),
        )])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };

        // Validate everything before touching shared state.
        let mut items = Vec::with_capacity(args.todos.len());
        for raw in args.todos {
            let status: TodoStatus = match raw.status.parse() {
                Ok(s) => s,
                Err(msg) => return ToolOutput::err(&call.id, format!("{msg} for todo '{}'", raw.content)),
            };
            items.push(TodoItem { content: raw.content, status, active_form: raw.active_form });
        }

        let update = self.ctx.todos().replace(items.clone());
        debug!(items = items.len(), started = update.started.len(), completed = update.completed.len(), "todos updated");
        ToolOutput::ok(&call.id, TodoState::summary(&items, &update))
    }
}

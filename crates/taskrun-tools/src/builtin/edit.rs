// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

/// Replace `old` in `text`.  Without `all` the match must be unique.
pub(crate) fn replace_in(text: &str, old: &str, new: &str, all: bool) -> Result<String, String> {
    if old.is_empty() {
        return Err("error: old_string must not be empty".into());
    }
    match text.matches(old).count() {
        0 => Err("error: old_string not found".into()),
        1 => Ok(text.replacen(old, new, 1)),
        n if !all => Err(format!("error: old_string appears {n} times, use all=true")),
        _ => Ok(text.replace(old, new)),
    }
}

pub struct EditTool {
    ctx: Arc<ToolContext>,
}

impl EditTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    path: String,
    old: String,
    new: String,
    #[serde(default)]
    all: bool,
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Replace text in a file. 'old' must match exactly once unless all=true, \
         in which case every occurrence is replaced."
    }

    fn parameters_schema(&self) -> Value {
        object([
            ("path", Param::Type("string")),
            ("old", Param::Type("string")),
            ("new", Param::Type("string")),
            ("all", Param::Type("boolean?")),
        ])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let path = self.ctx.resolve(&args.path);
        debug!(path = %path.display(), all = args.all, "edit tool");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => return ToolOutput::err(&call.id, format!("reading {}: {e}", args.path)),
        };
        let updated = match replace_in(&text, &args.old, &args.new, args.all) {
            Ok(u) => u,
            Err(msg) => return ToolOutput::err(&call.id, msg),
        };
        match tokio::fs::write(&path, updated).await {
            Ok(()) => ToolOutput::ok(&call.id, "ok"),
            Err(e) => ToolOutput::err(&call.id, format!("writing {}: {e}", args.path)),
        }
    }
}

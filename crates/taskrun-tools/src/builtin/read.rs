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

pub struct ReadTool {
    ctx: Arc<ToolContext>,
}

impl ReadTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    path: String,
    /// 0-based index of the first line
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read a file with line numbers. Optional offset (0-based first line) and limit (line count) \
         select a slice; by default the whole file is returned."
    }

    fn parameters_schema(&self) -> Value {
        object([
            ("path", Param::Type("string")),
            ("offset", Param::Type("number?")),
            ("limit", Param::Type("number?")),
        ])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let path = self.ctx.resolve(&args.path);
        debug!(path = %path.display(), "read tool");

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => return ToolOutput::err(&call.id, format!("reading {}: {e}", args.path)),
        };

        let offset = args.offset.unwrap_or(0);
        let total = text.lines().count();
        if offset > 0 && offset >= total {
            return ToolOutput::err(&call.id, format!("offset {offset} is past the end of the file ({total} lines)"));
        }
        let numbered: Vec<String> = text
            .lines()
            .enumerate()
            .skip(offset)
            .take(args.limit.unwrap_or(usize::MAX))
            .map(|(i, line)| format!("{:>4}| {}", i + 1, line))
            .collect();
        ToolOutput::ok(&call.id, numbered.join("\n"))
    }
}

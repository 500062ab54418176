// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

pub struct GlobTool {
    ctx: Arc<ToolContext>,
}

impl GlobTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    pat: String,
    #[serde(default)]
    path: Option<String>,
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (e.g. **/*.rs), newest first. \
         'path' sets the directory the pattern is relative to."
    }

    fn parameters_schema(&self) -> Value {
        object([("pat", Param::Type("string")), ("path", Param::Type("string?"))])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let base = self.ctx.resolve(args.path.as_deref().unwrap_or("."));
        let full = base.join(&args.pat);
        let pattern = full.to_string_lossy().into_owned();
        debug!(pattern = %pattern, "glob tool");

        let ctx = self.ctx.clone();
        let found = tokio::task::spawn_blocking(move || expand(&ctx, &pattern)).await;
        match found {
            Ok(Ok(paths)) if paths.is_empty() => ToolOutput::ok(&call.id, "none"),
            Ok(Ok(paths)) => ToolOutput::ok(&call.id, paths.join("\n")),
            Ok(Err(msg)) => ToolOutput::err(&call.id, msg),
            Err(e) => ToolOutput::err(&call.id, format!("glob failed: {e}")),
        }
    }
}

/// Matches sorted newest first, ties broken by path.
fn expand(ctx: &ToolContext, pattern: &str) -> Result<Vec<String>, String> {
    let entries = glob::glob(pattern).map_err(|e| format!("invalid glob pattern: {e}"))?;
    let mut hits: Vec<(SystemTime, String)> = entries
        .filter_map(Result::ok)
        .filter_map(|p| {
            let mtime = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((mtime, ctx.display_path(&p)))
        })
        .collect();
    hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(hits.into_iter().map(|(_, p)| p).collect())
}

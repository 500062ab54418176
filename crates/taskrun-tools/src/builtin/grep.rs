// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

const MAX_HITS: usize = 50;
const SKIP_DIRS: &[&str] = &[".git", "node_modules"];

pub struct GrepTool {
    ctx: Arc<ToolContext>,
}

impl GrepTool {
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
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns up to 50 matches as \
         path:line:text, skipping .git and node_modules."
    }

    fn parameters_schema(&self) -> Value {
        object([("pat", Param::Type("string")), ("path", Param::Type("string?"))])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let re = match Regex::new(&args.pat) {
            Ok(r) => r,
            Err(e) => return ToolOutput::err(&call.id, format!("invalid regex: {e}")),
        };
        let root = self.ctx.resolve(args.path.as_deref().unwrap_or("."));
        debug!(pattern = %args.pat, root = %root.display(), "grep tool");

        let ctx = self.ctx.clone();
        match tokio::task::spawn_blocking(move || search(&ctx, &root, &re)).await {
            Ok(hits) if hits.is_empty() => ToolOutput::ok(&call.id, "none"),
            Ok(hits) => ToolOutput::ok(&call.id, hits.join("\n")),
            Err(e) => ToolOutput::err(&call.id, format!("grep failed: {e}")),
        }
    }
}

fn search(ctx: &ToolContext, root: &Path, re: &Regex) -> Vec<String> {
    let mut hits = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
        !(e.file_type().is_dir() && e.depth() > 0 && SKIP_DIRS.iter().any(|s| e.file_name() == *s))
    });
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        // Binary or unreadable files are skipped.
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let shown = ctx.display_path(entry.path());
        for (i, line) in text.lines().enumerate() {
            if re.is_match(line) {
                hits.push(format!("{shown}:{}:{}", i + 1, line.trim_end()));
                if hits.len() >= MAX_HITS {
                    return hits;
                }
            }
        }
    }
    hits
}

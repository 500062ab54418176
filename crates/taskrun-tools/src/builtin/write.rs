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

pub struct WriteTool {
    ctx: Arc<ToolContext>,
}

impl WriteTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories and overwriting any existing file."
    }

    fn parameters_schema(&self) -> Value {
        object([("path", Param::Type("string")), ("content", Param::Type("string"))])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let path = self.ctx.resolve(&args.path);
        debug!(path = %path.display(), bytes = args.content.len(), "write tool");

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolOutput::err(&call.id, format!("creating {}: {e}", parent.display()));
            }
        }
        match tokio::fs::write(&path, args.content).await {
            Ok(()) => ToolOutput::ok(&call.id, "ok"),
            Err(e) => ToolOutput::err(&call.id, format!("writing {}: {e}", args.path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::builtin::testutil::{call, ctx};

    #[tokio::test]
    async fn creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteTool::new(ctx(dir.path()));
        let out = tool.execute(&call("write", json!({"path": "a/b/c.txt", "content": "v1"}))).await;
        assert_eq!(out.content, "ok");
        tool.execute(&call("write", json!({"path": "a/b/c.txt", "content": "v2"}))).await;
        assert_eq!(std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(), "v2");
    }

    #[tokio::test]
    async fn missing_content_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = WriteTool::new(ctx(dir.path())).execute(&call("write", json!({"path": "x"}))).await;
        assert!(out.is_error);
        assert!(!dir.path().join("x").exists());
    }
}

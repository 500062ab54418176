// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::edit::replace_in;
use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

pub struct MultiEditTool {
    ctx: Arc<ToolContext>,
}

impl MultiEditTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    file_path: String,
    edits: Vec<EditOp>,
}

#[derive(Deserialize)]
struct EditOp {
    old_string: String,
    new_string: String,
    #[serde(default)]
    replace_all: bool,
}

#[async_trait]
impl Tool for MultiEditTool {
    fn name(&self) -> &str {
        "multiedit"
    }

    fn description(&self) -> &str {
        "Apply several edits to one file in order. A failing edit is reported by index and \
         does not stop the rest. The file is written only if its content changed."
    }

    fn parameters_schema(&self) -> Value {
        object([
            ("file_path", Param::Type("string")),
            (
                "edits",
                Param::Schema(json!({
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "old_string": { "type": "string" },
                            "new_string": { "type": "string" },
                            "replace_all": { "type": "boolean" }
                        },
                        "required": ["old_string", "new_string"]
                    }
                })),
            ),
        ])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let path = self.ctx.resolve(&args.file_path);

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) => return ToolOutput::err(&call.id, format!("reading {}: {e}", args.file_path)),
        };

        let mut buffer = original.clone();
        let mut applied = 0usize;
        let mut failed = Vec::new();
        for (index, op) in args.edits.iter().enumerate() {
            match replace_in(&buffer, &op.old_string, &op.new_string, op.replace_all) {
                Ok(next) => {
                    buffer = next;
                    applied += 1;
                }
                Err(error) => failed.push(json!({ "index": index, "error": error })),
            }
        }

        let written = buffer != original;
        debug!(path = %path.display(), applied, failed = failed.len(), written, "multiedit tool");
        if written {
            if let Err(e) = tokio::fs::write(&path, &buffer).await {
                return ToolOutput::err(&call.id, format!("writing {}: {e}", args.file_path));
            }
        }

        let report = json!({
            "file_path": args.file_path,
            "editsApplied": applied,
            "failed_edits": failed,
            "written": written,
        });
        ToolOutput::ok(&call.id, report.to_string())
    }
}

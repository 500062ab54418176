// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

pub struct LsTool {
    ctx: Arc<ToolContext>,
}

impl LsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    #[serde(default)]
    path: Option<String>,
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List a directory (default: the working directory). Directories end with '/'."
    }

    fn parameters_schema(&self) -> Value {
        object([("path", Param::Type("string?"))])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let shown = args.path.as_deref().unwrap_or(".");
        let dir = self.ctx.resolve(shown);

        let mut rd = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => return ToolOutput::err(&call.id, format!("listing {shown}: {e}")),
        };
        let mut names = Vec::new();
        loop {
            match rd.next_entry().await {
                Ok(Some(entry)) => {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    names.push(name);
                }
                Ok(None) => break,
                Err(e) => return ToolOutput::err(&call.id, format!("listing {shown}: {e}")),
            }
        }
        if names.is_empty() {
            return ToolOutput::ok(&call.id, "(empty)");
        }
        names.sort();
        ToolOutput::ok(&call.id, names.join("\n"))
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use taskrun_sandbox::{ExecResult, SandboxError};

use crate::schema::{object, Param};
use crate::{parse_args, Tool, ToolCall, ToolContext, ToolOutput};

pub struct BashTool {
    ctx: Arc<ToolContext>,
}

impl BashTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct Args {
    cmd: String,
}

/// stdout then stderr, `(exit: N)` on failure, `(empty)` for blank output.
fn render(r: &ExecResult) -> String {
    let mut out = format!("{}{}", r.stdout, r.stderr);
    if r.exit_code != 0 {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("(exit: {})", r.exit_code));
    }
    if out.trim().is_empty() {
        "(empty)".into()
    } else {
        out
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command in the task's working directory and return stdout followed by \
         stderr. Commands run sandboxed with a timeout and an output cap."
    }

    fn parameters_schema(&self) -> Value {
        object([("cmd", Param::Type("string"))])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let args: Args = match parse_args(call) {
            Ok(a) => a,
            Err(e) => return e,
        };
        match self.ctx.sandbox().run(&args.cmd, self.ctx.workdir()).await {
            Ok(r) => ToolOutput { call_id: call.id.clone(), content: render(&r), is_error: r.exit_code != 0 },
            Err(SandboxError::TimedOut { timeout, result }) => {
                let partial = format!("{}{}", result.stdout, result.stderr);
                let mut msg = format!("command timed out after {}s", timeout.as_secs());
                if !partial.trim().is_empty() {
                    msg.push('\n');
                    msg.push_str(&partial);
                }
                ToolOutput::err(&call.id, msg)
            }
            Err(e) => ToolOutput::err(&call.id, e.to_string()),
        }
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use taskrun_model::ToolDef;
use tracing::{debug, error};

use crate::builtin::{
    BashTool, EditTool, GlobTool, GrepTool, LsTool, MultiEditTool, ReadTool, TodosTool, WriteTool,
};
use crate::{Tool, ToolCall, ToolContext, ToolOutput};

/// Tools available to one task, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nine built-in tools bound to `ctx`.
    pub fn for_task(ctx: Arc<ToolContext>) -> Self {
        let mut reg = Self::new();
        reg.register(ReadTool::new(ctx.clone()));
        reg.register(WriteTool::new(ctx.clone()));
        reg.register(EditTool::new(ctx.clone()));
        reg.register(MultiEditTool::new(ctx.clone()));
        reg.register(GlobTool::new(ctx.clone()));
        reg.register(GrepTool::new(ctx.clone()));
        reg.register(BashTool::new(ctx.clone()));
        reg.register(LsTool::new(ctx.clone()));
        reg.register(TodosTool::new(ctx));
        reg
    }

    /// Registering a name twice replaces the earlier tool.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn all(&self) -> &HashMap<String, Arc<dyn Tool>> {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool descriptions for the model, sorted by name.
    pub fn make_schema(&self) -> Vec<ToolDef> {
        let mut defs: Vec<ToolDef> = self
            .tools
            .values()
            .map(|t| ToolDef {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Run `call` on its own task so a panicking tool cannot take the
    /// loop down.  Every call yields exactly one output; a panic becomes
    /// an error result for the same call id.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.get(&call.name) else {
            return ToolOutput::err(&call.id, format!("unknown tool: {}", call.name));
        };
        debug!(tool = %call.name, id = %call.id, "dispatching tool call");

        let owned = call.clone();
        match tokio::spawn(async move { tool.execute(&owned).await }).await {
            Ok(out) => out,
            Err(e) => {
                error!(tool = %call.name, id = %call.id, error = %e, "tool execution panicked");
                ToolOutput::err(&call.id, format!("tool {} panicked", call.name))
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use taskrun_config::SandboxConfig;
    use taskrun_sandbox::Sandbox;

    use super::*;

    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, format!("echo:{}", call.args))
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "explode"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _call: &ToolCall) -> ToolOutput {
            panic!("kaboom")
        }
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall { id: id.into(), name: name.into(), args: json!({"x": 1}) }
    }

    #[test]
    fn register_and_get() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "echo" });
        assert!(reg.get("echo").is_some());
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn registering_same_name_twice_overwrites() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "t" });
        reg.register(EchoTool { name: "t" });
        assert_eq!(reg.all().len(), 1);
    }

    #[test]
    fn make_schema_is_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "zeta" });
        reg.register(EchoTool { name: "alpha" });
        let names: Vec<String> = reg.make_schema().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn execute_known_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool { name: "echo" });
        let out = reg.execute(&call("1", "echo")).await;
        assert!(!out.is_error);
        assert!(out.content.starts_with("echo:"));
    }

    #[tokio::test]
    async fn unknown_tool_is_error_string() {
        let out = ToolRegistry::new().execute(&call("x", "missing")).await;
        assert!(out.is_error);
        assert_eq!(out.content, "error: unknown tool: missing");
        assert_eq!(out.call_id, "x");
    }

    #[tokio::test]
    async fn panic_is_recovered_into_error_result() {
        let mut reg = ToolRegistry::new();
        reg.register(PanicTool);
        let out = reg.execute(&call("p1", "explode")).await;
        assert!(out.is_error);
        assert_eq!(out.call_id, "p1");
        assert_eq!(out.content, "error: tool explode panicked");
    }

    #[test]
    fn for_task_registers_nine_builtins() {
        let ctx = Arc::new(ToolContext::new("/tmp", Sandbox::unsandboxed(SandboxConfig::default())));
        let reg = ToolRegistry::for_task(ctx);
        assert_eq!(
            reg.names(),
            vec!["bash", "edit", "glob", "grep", "ls", "multiedit", "read", "todos", "write"]
        );
        for def in reg.make_schema() {
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }
}

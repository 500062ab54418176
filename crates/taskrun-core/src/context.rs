// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskrun_sandbox::Sandbox;
use taskrun_tools::{TodoState, ToolContext, ToolRegistry};
use tokio_util::sync::CancellationToken;

/// Everything one task run owns.  Nothing in here is shared with other
/// tasks unless the caller hands the same handles to both.
#[derive(Clone)]
pub struct TaskContext {
    workdir: PathBuf,
    tools: Arc<ToolRegistry>,
    todos: TodoState,
    cancel: CancellationToken,
}

impl TaskContext {
    /// Built-in tools bound to `workdir` and `sandbox`.
    pub fn new(workdir: impl Into<PathBuf>, sandbox: Sandbox, cancel: CancellationToken) -> Self {
        let workdir = workdir.into();
        let todos = TodoState::new();
        let tool_ctx = ToolContext::new(workdir.clone(), sandbox).with_todos(todos.clone());
        let tools = Arc::new(ToolRegistry::for_task(Arc::new(tool_ctx)));
        Self { workdir, tools, todos, cancel }
    }

    /// Custom registry, e.g. for tests.  `todos` should be the state the
    /// registry's tools write to if `plan` events are wanted.
    pub fn with_registry(
        workdir: impl Into<PathBuf>,
        tools: ToolRegistry,
        todos: TodoState,
        cancel: CancellationToken,
    ) -> Self {
        Self { workdir: workdir.into(), tools: Arc::new(tools), todos, cancel }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn todos(&self) -> &TodoState {
        &self.todos
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use taskrun_config::{AgentConfig, SandboxConfig};
use taskrun_model::ModelProvider;
use taskrun_sandbox::Sandbox;
use tokio_util::sync::CancellationToken;

use crate::{Agent, AgentError, EventSink, TaskContext};

/// One unit of work handed to a backend.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub prompt: String,
    /// Supplied by the caller (e.g. a worktree manager).
    pub workdir: PathBuf,
}

/// A way of executing a task that reports progress as canonical events.
///
/// Implementations emit only [`crate::StreamEvent`]s through `sink`, in
/// order, and finish with either a `done` or an `error` event.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, task: TaskRequest, sink: EventSink, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// The in-process HTTP loop.
pub struct NativeBackend {
    model: Arc<dyn ModelProvider>,
    agent: AgentConfig,
    sandbox: SandboxConfig,
}

impl NativeBackend {
    pub fn new(model: Arc<dyn ModelProvider>, agent: AgentConfig, sandbox: SandboxConfig) -> Self {
        Self { model, agent, sandbox }
    }
}

#[async_trait]
impl Backend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    async fn run(&self, task: TaskRequest, sink: EventSink, cancel: CancellationToken) -> anyhow::Result<()> {
        let ctx = TaskContext::new(task.workdir, Sandbox::new(self.sandbox.clone()), cancel);
        let agent = Agent::new(self.model.clone(), self.agent.clone());
        match agent.run(&ctx, &task.prompt, &sink).await {
            Ok(_) => Ok(()),
            // Already reported as an event; the caller asked for it.
            Err(AgentError::Cancelled) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

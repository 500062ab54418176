// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taskrun_config::OverflowPolicy;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Closed set of event types every backend emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Plan,
    Tool,
    Result,
    Text,
    Error,
    Done,
    Session,
    ToolResult,
}

/// The one output shape shared by the native loop and the subprocess
/// backends.  Serializes as `{"type", "content", "tool"?, "args"?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

impl StreamEvent {
    fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self { kind, content: content.into(), tool: None, args: None }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(EventKind::Text, content)
    }

    /// A tool invocation starting; `args` is the JSON-encoded input.
    pub fn tool(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self { tool: Some(name.into()), args: Some(args.into()), ..Self::new(EventKind::Tool, "") }
    }

    /// Native loop tool output (possibly shortened for display).
    pub fn result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { tool: Some(name.into()), ..Self::new(EventKind::Result, content) }
    }

    /// Tool output reported by a subprocess backend.
    pub fn tool_result(content: impl Into<String>, tool: Option<String>) -> Self {
        Self { tool, ..Self::new(EventKind::ToolResult, content) }
    }

    pub fn plan(content: impl Into<String>) -> Self {
        Self::new(EventKind::Plan, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(EventKind::Error, content)
    }

    pub fn done(content: impl Into<String>) -> Self {
        Self::new(EventKind::Done, content)
    }

    pub fn session(id: impl Into<String>) -> Self {
        Self::new(EventKind::Session, id)
    }
}

/// Where a run delivers its events, in emission order.
///
/// `Callback` is synchronous; backpressure is the callback's problem.
/// `Queue` is a bounded channel whose full-queue behaviour is fixed by
/// [`OverflowPolicy`].
#[derive(Clone)]
pub enum EventSink {
    Callback(Arc<dyn Fn(StreamEvent) + Send + Sync>),
    Queue {
        tx: mpsc::Sender<StreamEvent>,
        policy: OverflowPolicy,
        dropped: Arc<AtomicU64>,
    },
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("EventSink::Callback"),
            Self::Queue { policy, .. } => write!(f, "EventSink::Queue({policy:?})"),
        }
    }
}

impl EventSink {
    pub fn callback(f: impl Fn(StreamEvent) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    pub fn channel(capacity: usize, policy: OverflowPolicy) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::Queue { tx, policy, dropped: Arc::new(AtomicU64::new(0)) }, rx)
    }

    /// Deliver one event.  Returns `false` once the consumer is gone, which
    /// tells the producer to stop.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        match self {
            Self::Callback(f) => {
                f(event);
                true
            }
            Self::Queue { tx, policy: OverflowPolicy::Block, .. } => tx.send(event).await.is_ok(),
            Self::Queue { tx, policy: OverflowPolicy::DropNewest, dropped } => match tx.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(ev)) => {
                    let n = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(kind = ?ev.kind, dropped_total = n, "event queue full; dropping event");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            },
        }
    }

    /// Events discarded under [`OverflowPolicy::DropNewest`].
    pub fn dropped(&self) -> u64 {
        match self {
            Self::Callback(_) => 0,
            Self::Queue { dropped, .. } => dropped.load(Ordering::Relaxed),
        }
    }
}

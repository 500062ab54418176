// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agent;
mod backend;
mod context;
mod error;
mod events;
mod prompts;


pub use agent::Agent;
pub use backend::{Backend, NativeBackend, TaskRequest};
pub use context::TaskContext;
pub use error::AgentError;
pub use events::{EventKind, EventSink, StreamEvent};
pub use prompts::system_prompt;
pub use taskrun_config::OverflowPolicy;
pub use tokio_util::sync::CancellationToken;

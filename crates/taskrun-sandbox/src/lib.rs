// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Shell command execution with an allowlist bypass, a bubblewrap jail on
//! Linux, a hard timeout and per-stream output caps.

mod command;
mod error;
mod executor;
mod jail;
mod limited;

pub use command::base_executable;
pub use error::SandboxError;
pub use executor::{ExecMode, ExecResult, Sandbox};
pub use jail::jail_args;
pub use limited::{LimitedBuffer, TRUNCATION_MARKER};

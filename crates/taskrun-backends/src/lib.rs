// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Backends that drive an external agent CLI and translate its
//! line-delimited JSON into [`taskrun_core::StreamEvent`]s.

mod claude;
mod codex;
mod decoder;
mod process;

pub use claude::{ClaudeBackend, ClaudeDecoder};
pub use codex::{CodexBackend, CodexDecoder};
pub use decoder::{decode_lines, LineDecoder};
pub use process::{run_cli, CliCommand};

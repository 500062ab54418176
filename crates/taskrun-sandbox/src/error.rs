// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use thiserror::Error;

use crate::ExecResult;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while running command: {0}")]
    Io(#[from] std::io::Error),

    /// The deadline fired; `result` holds whatever output was captured
    /// before the process group was killed.
    #[error("command timed out after {}s", timeout.as_secs())]
    TimedOut { timeout: Duration, result: Box<ExecResult> },
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use taskrun_model::ModelError;
use thiserror::Error;

/// Why a native run stopped before `done`.  Each one has already been
/// reported as an `error` event when it is returned.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("cancelled")]
    Cancelled,

    /// The event consumer went away.
    #[error("event consumer disconnected")]
    SinkClosed,
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

use crate::{CompletionRequest, ModelError, ModelResponse};

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Model identifier sent on the wire.
    fn model_name(&self) -> &str;

    /// Send the whole conversation and return the assistant's reply as
    /// ordered content blocks.  The caller replays full history each turn.
    async fn complete(&self, req: CompletionRequest) -> Result<ModelResponse, ModelError>;
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod anthropic;
mod error;
mod mock;
mod openai;
mod provider;
mod types;

pub use anthropic::AnthropicProvider;
pub use error::ModelError;
pub use mock::ScriptedMockProvider;
pub use openai::OpenAiProvider;
pub use provider::ModelProvider;
pub use types::*;

use taskrun_config::{ProviderConfig, ProviderKind};

/// Construct a boxed [`ModelProvider`] for the configured wire format.
///
/// The API key is resolved once here; a missing key is reported on the
/// first request, not at construction.
pub fn from_config(cfg: &ProviderConfig) -> Box<dyn ModelProvider> {
    match cfg.kind {
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(cfg)),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(cfg)),
    }
}

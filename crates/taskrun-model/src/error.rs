// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Failure talking to an LLM endpoint.  Every variant aborts the agent loop.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: &'static str },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} error {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unreadable response: {reason}")]
    Decode { provider: &'static str, reason: String },
}

impl ModelError {
    pub(crate) fn decode(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode { provider, reason: reason.into() }
    }
}

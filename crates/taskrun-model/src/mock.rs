// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{CompletionRequest, ModelError, ModelResponse};

/// A pre-scripted provider for tests.  Each call to `complete` pops the
/// next scripted reply; once the script is exhausted every call answers
/// with a plain `"[script exhausted]"` text so loops terminate.
pub struct ScriptedMockProvider {
    script: Arc<Mutex<VecDeque<Result<ModelResponse, ModelError>>>>,
    /// Every request seen, in call order.
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(script: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![ModelResponse::text(reply)])
    }

    /// One tool call, then a final text reply after the result comes back.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            ModelResponse::tool_use(tool_id, tool_name, input),
            ModelResponse::text(final_text),
        ])
    }

    /// First call fails the way a non-2xx endpoint would.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::from_results(vec![Err(ModelError::Status {
            provider: "scripted-mock",
            status,
            body: body.into(),
        })])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ModelResponse, ModelError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(req);
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(ModelResponse::text("[script exhausted]")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ContentBlock, Message, ModelProvider};

    #[tokio::test]
    async fn pops_in_order_then_falls_back() {
        let p = ScriptedMockProvider::tool_then_text("t1", "ls", json!({}), "done");
        let req = CompletionRequest { messages: vec![Message::user("x")], ..Default::default() };

        let first = p.complete(req.clone()).await.unwrap();
        assert!(first.has_tool_calls());
        let second = p.complete(req.clone()).await.unwrap();
        assert_eq!(second.content, vec![ContentBlock::text("done")]);
        let third = p.complete(req).await.unwrap();
        assert_eq!(third.content, vec![ContentBlock::text("[script exhausted]")]);
        assert_eq!(p.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_returns_status_error() {
        let p = ScriptedMockProvider::failing(500, "boom");
        let err = p.complete(CompletionRequest::default()).await.unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 500, .. }));
        assert!(p.last_request().is_some());
    }
}

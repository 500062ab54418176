// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Wire-format tests: a one-shot HTTP/1.1 server on loopback stands in for
//! the provider, so both the outgoing request and the parsed reply can be
//! checked without keys or network access.

use std::collections::HashMap;

use serde_json::{json, Value};
use taskrun_config::{ProviderConfig, ProviderKind};
use taskrun_model::{from_config, CompletionRequest, ContentBlock, Message, ModelError, ToolDef};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

// ── Minimal HTTP/1.1 mock server ──────────────────────────────────────────────

#[derive(Debug)]
struct CapturedRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Value,
}

async fn mock_server_once(
    status: u16,
    resp_body: impl Into<String> + Send + 'static,
) -> (u16, tokio::sync::oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel::<CapturedRequest>();

    tokio::spawn(async move {
        let resp_body: String = resp_body.into();
        let (stream, _) = listener.accept().await.expect("accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await.unwrap();
        let mut parts = request_line.trim().splitn(3, ' ');
        let method = parts.next().unwrap_or("").to_string();
        let path = parts.next().unwrap_or("").to_string();

        let mut headers: HashMap<String, String> = HashMap::new();
        let mut content_length: usize = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((k, v)) = trimmed.split_once(": ") {
                let key = k.to_lowercase();
                if key == "content-length" {
                    content_length = v.parse().unwrap_or(0);
                }
                headers.insert(key, v.to_string());
            }
        }

        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        let _ = tx.send(CapturedRequest { method, path, headers, body });

        let http_resp = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            resp_body.len(),
            resp_body,
        );
        let _ = write_half.write_all(http_resp.as_bytes()).await;
    });

    (port, rx)
}

fn anthropic_cfg(port: u16) -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::Anthropic,
        api_url: Some(format!("http://127.0.0.1:{port}/v1/messages")),
        api_key: Some("sk-ant-test".into()),
        model: "claude-test".into(),
        max_tokens: Some(64),
        ..ProviderConfig::default()
    }
}

fn openai_cfg(port: u16) -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::OpenAi,
        api_url: Some(format!("http://127.0.0.1:{port}/v1/chat/completions")),
        api_key: Some("sk-oa-test".into()),
        model: "gpt-test".into(),
        max_tokens: None,
        ..ProviderConfig::default()
    }
}

fn ls_tool() -> ToolDef {
    ToolDef {
        name: "ls".into(),
        description: "List a directory".into(),
        input_schema: json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": []}),
    }
}

// ── Anthropic ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anthropic_request_headers_and_body() {
    let reply = json!({
        "content": [{"type": "text", "text": "hi"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 1, "output_tokens": 1}
    });
    let (port, req_rx) = mock_server_once(200, reply.to_string()).await;

    let provider = from_config(&anthropic_cfg(port));
    let resp = provider
        .complete(CompletionRequest {
            system: Some("be brief".into()),
            messages: vec![Message::user("hello")],
            tools: vec![ls_tool()],
        })
        .await
        .unwrap();
    assert_eq!(resp.content, vec![ContentBlock::text("hi")]);

    let req = req_rx.await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/v1/messages");
    assert_eq!(req.headers.get("x-api-key").map(String::as_str), Some("sk-ant-test"));
    assert_eq!(req.headers.get("anthropic-version").map(String::as_str), Some("2023-06-01"));
    assert_eq!(req.body["model"], "claude-test");
    assert_eq!(req.body["max_tokens"], 64);
    assert_eq!(req.body["system"], "be brief");
    assert_eq!(req.body["tools"][0]["name"], "ls");
    assert!(req.body["tools"][0].get("input_schema").is_some());
}

#[tokio::test]
async fn anthropic_tool_use_reply_is_canonical() {
    let reply = json!({
        "content": [
            {"type": "text", "text": "Listing"},
            {"type": "tool_use", "id": "toolu_1", "name": "ls", "input": {"path": "src"}}
        ],
        "stop_reason": "tool_use"
    });
    let (port, _rx) = mock_server_once(200, reply.to_string()).await;
    let resp = from_config(&anthropic_cfg(port))
        .complete(CompletionRequest { messages: vec![Message::user("ls src")], ..Default::default() })
        .await
        .unwrap();
    assert_eq!(resp.content.len(), 2);
    assert_eq!(
        resp.content[1],
        ContentBlock::ToolUse { id: "toolu_1".into(), name: "ls".into(), input: json!({"path": "src"}) }
    );
}

#[tokio::test]
async fn anthropic_non_2xx_is_status_error() {
    let (port, _rx) = mock_server_once(529, r#"{"type":"error","error":{"type":"overloaded_error"}}"#).await;
    let err = from_config(&anthropic_cfg(port))
        .complete(CompletionRequest { messages: vec![Message::user("x")], ..Default::default() })
        .await
        .unwrap_err();
    match err {
        ModelError::Status { status, body, .. } => {
            assert_eq!(status, 529);
            assert!(body.contains("overloaded_error"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

// ── OpenAI ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_request_uses_bearer_and_system_message() {
    let reply = json!({
        "choices": [{"message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
    });
    let (port, req_rx) = mock_server_once(200, reply.to_string()).await;

    let resp = from_config(&openai_cfg(port))
        .complete(CompletionRequest {
            system: Some("sys".into()),
            messages: vec![Message::user("hello")],
            tools: vec![ls_tool()],
        })
        .await
        .unwrap();
    assert_eq!(resp.content, vec![ContentBlock::text("ok")]);

    let req = req_rx.await.unwrap();
    assert_eq!(req.path, "/v1/chat/completions");
    assert_eq!(req.headers.get("authorization").map(String::as_str), Some("Bearer sk-oa-test"));
    let msgs = req.body["messages"].as_array().unwrap();
    assert_eq!(msgs[0]["role"], "system");
    assert_eq!(msgs[1]["role"], "user");
    assert_eq!(req.body["tools"][0]["type"], "function");
    assert_eq!(req.body["tools"][0]["function"]["parameters"]["type"], "object");
}

#[tokio::test]
async fn openai_tool_calls_become_tool_use_blocks() {
    let reply = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "call_a", "type": "function", "function": {"name": "ls", "arguments": "{}"}},
                    {"id": "call_b", "type": "function", "function": {"name": "read", "arguments": "{\"path\":\"a\"}"}}
                ]
            },
            "finish_reason": "tool_calls"
        }]
    });
    let (port, _rx) = mock_server_once(200, reply.to_string()).await;
    let resp = from_config(&openai_cfg(port))
        .complete(CompletionRequest { messages: vec![Message::user("x")], ..Default::default() })
        .await
        .unwrap();
    let ids: Vec<&str> = resp
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["call_a", "call_b"]);
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = from_config(&openai_cfg(port))
        .complete(CompletionRequest { messages: vec![Message::user("x")], ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Transport { .. }), "{err:?}");
}

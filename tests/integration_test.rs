// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end runs of the native backend with the scripted model provider.
use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Value};
use taskrun_config::Config;
use taskrun_core::{Backend, CancellationToken, EventKind, EventSink, NativeBackend, StreamEvent, TaskRequest};
use taskrun_model::{ModelProvider, ScriptedMockProvider};

fn native(model: ScriptedMockProvider, config: &Config) -> NativeBackend {
    let model: Arc<dyn ModelProvider> = Arc::new(model);
    NativeBackend::new(model, config.agent.clone(), config.sandbox.clone())
}

async fn run_to_lines(backend: &dyn Backend, workdir: &std::path::Path, prompt: &str) -> Vec<Value> {
    let (sink, mut rx) = EventSink::channel(64, Default::default());
    let consumer = tokio::spawn(async move {
        let mut lines = Vec::new();
        while let Some(ev) = rx.recv().await {
            lines.push(serde_json::to_string(&ev).unwrap());
        }
        lines
    });
    let task = TaskRequest { prompt: prompt.into(), workdir: workdir.to_path_buf() };
    backend.run(task, sink, CancellationToken::new()).await.unwrap();
    consumer.await.unwrap().iter().map(|l| serde_json::from_str(l).unwrap()).collect()
}

#[tokio::test]
async fn native_backend_streams_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "remember the milk\n").unwrap();
    let model =
        ScriptedMockProvider::tool_then_text("c1", "grep", json!({"pat": "milk"}), "Found it in notes.txt");

    let lines = run_to_lines(&native(model, &Config::default()), dir.path(), "where is milk?").await;

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["tool", "result", "text", "done"]);
    assert_eq!(lines[0]["tool"], "grep");
    assert_eq!(lines[0]["args"], r#"{"pat":"milk"}"#);
    assert_eq!(lines[1]["content"], "notes.txt:1:remember the milk");
    assert!(lines[2].get("tool").is_none());
    assert_eq!(lines[3]["content"], "Found it in notes.txt");
}

#[cfg(unix)]
#[tokio::test]
async fn configured_sandbox_limits_reach_bash_tool() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sandbox]\nenabled = false\noutput_limit_bytes = 16\n\n[agent]\ndisplay_limit = 1000").unwrap();
    let config = taskrun_config::load(Some(file.path())).unwrap();
    assert_eq!(config.sandbox.output_limit_bytes, 16);

    let model = ScriptedMockProvider::tool_then_text(
        "b1",
        "bash",
        json!({"cmd": "printf '%s' 0123456789012345678901234567890123456789"}),
        "done",
    );
    let lines = run_to_lines(&native(model, &config), dir.path(), "print digits").await;

    let result = lines[1]["content"].as_str().unwrap();
    assert!(result.starts_with("0123456789012345"), "{result}");
    assert!(result.contains("[output truncated]"), "{result}");
}

#[tokio::test]
async fn cancelled_native_run_reports_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let backend = native(ScriptedMockProvider::always_text("never"), &Config::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let e = events.clone();
    let sink = EventSink::callback(move |ev| e.lock().unwrap().push(ev));
    let task = TaskRequest { prompt: "x".into(), workdir: dir.path().to_path_buf() };
    backend.run(task, sink, cancel).await.unwrap();

    assert_eq!(*events.lock().unwrap(), vec![StreamEvent::error("cancelled")]);
}

#[tokio::test]
async fn model_failure_surfaces_as_error_event_and_err() {
    let dir = tempfile::tempdir().unwrap();
    let backend = native(ScriptedMockProvider::failing(401, "invalid x-api-key"), &Config::default());
    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let e = events.clone();
    let sink = EventSink::callback(move |ev| e.lock().unwrap().push(ev));
    let task = TaskRequest { prompt: "x".into(), workdir: dir.path().to_path_buf() };

    let err = backend.run(task, sink, CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("401"), "{err}");
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Error);
}

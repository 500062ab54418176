// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context};
use taskrun_core::{EventKind, EventSink, StreamEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::preview;
use crate::LineDecoder;

/// Lines of stderr kept for the exit error message.
const STDERR_TAIL_LINES: usize = 20;
/// How long to wait for the stderr reader after the child exits.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A fully resolved child process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub workdir: PathBuf,
}

/// Spawn `cmd`, translate its stdout line by line with `decoder` and push
/// the events into `sink` in line order.
///
/// The run always ends with a `done` or an `error` event.  Cancelling
/// kills and reaps the child.  Returns `Err` only when the child could
/// not be started or the event consumer went away.
pub async fn run_cli<D: LineDecoder>(
    cmd: CliCommand,
    mut decoder: D,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .envs(cmd.env.iter().map(|(k, v)| (k, v)))
        .current_dir(&cmd.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(c) => c,
        Err(e) => {
            sink.emit(StreamEvent::error(format!("failed to start {}: {e}", cmd.program))).await;
            return Err(e).with_context(|| format!("spawning {}", cmd.program));
        }
    };
    info!(program = %cmd.program, pid = ?child.id(), workdir = %cmd.workdir.display(), "agent CLI started");

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill().await;
        bail!("{}: stdio was not captured", cmd.program);
    };

    let stderr_task = tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = String::from_utf8_lossy(&buf).trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            debug!(line = %line, "agent CLI stderr");
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    });

    let mut stdout = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut finished = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(program = %cmd.program, "cancelled; killing agent CLI");
                let _ = child.kill().await;
                stderr_task.abort();
                sink.emit(StreamEvent::error("cancelled")).await;
                return Ok(());
            }
            read = stdout.read_until(b'\n', &mut buf) => {
                match read {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "reading agent CLI stdout failed");
                        break;
                    }
                }
                // Invalid UTF-8 is replaced so one bad line cannot end the stream.
                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let events = match decoder.decode(trimmed) {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(error = %e, line = %preview(trimmed), "skipping undecodable line");
                        continue;
                    }
                };
                for ev in events {
                    if matches!(ev.kind, EventKind::Done | EventKind::Error) {
                        finished = true;
                    }
                    if !sink.emit(ev).await {
                        let _ = child.kill().await;
                        stderr_task.abort();
                        bail!("event consumer closed");
                    }
                }
            }
        }
    }

    // Stdout is closed but the child may still be running.
    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(program = %cmd.program, "cancelled after stdout closed; killing agent CLI");
            let _ = child.kill().await;
            stderr_task.abort();
            sink.emit(StreamEvent::error("cancelled")).await;
            return Ok(());
        }
        status = child.wait() => status.with_context(|| format!("waiting for {}", cmd.program))?,
    };
    let tail = match tokio::time::timeout(DRAIN_GRACE, stderr_task).await {
        Ok(Ok(tail)) => tail,
        _ => VecDeque::new(),
    };
    info!(program = %cmd.program, %status, "agent CLI exited");

    if !finished {
        let mut msg = if status.success() {
            format!("{} exited without a result", cmd.program)
        } else {
            format!("{} exited with {status}", cmd.program)
        };
        if !tail.is_empty() {
            msg.push('\n');
            msg.push_str(&Vec::from(tail).join("\n"));
        }
        sink.emit(StreamEvent::error(msg)).await;
    }
    Ok(())
}

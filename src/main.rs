// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{BackendArg, Cli, Commands, RunArgs};
use taskrun_backends::{ClaudeBackend, CodexBackend};
use taskrun_config::Config;
use taskrun_core::{Backend, CancellationToken, EventKind, EventSink, NativeBackend, StreamEvent, TaskRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Completions { shell } => {
            cli::print_completions(shell);
            Ok(())
        }
        Commands::ShowConfig => {
            let config = taskrun_config::load(cli.config.as_deref())?;
            print!("{}", serde_yaml::to_string(&config).context("rendering configuration")?);
            Ok(())
        }
        Commands::Run(args) => {
            let ok = run(args, cli.config.as_deref()).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Run one task to completion.  Returns `false` when it ended in an
/// `error` event.
async fn run(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<bool> {
    let mut config = taskrun_config::load(config_path)?;
    args.apply(&mut config);

    let workdir = match &args.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let workdir = workdir
        .canonicalize()
        .with_context(|| format!("working directory {}", workdir.display()))?;
    let prompt = args.read_prompt()?;
    let backend = build_backend(args.backend, &config);
    info!(backend = backend.name(), workdir = %workdir.display(), "starting task");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling task");
                cancel.cancel();
            }
        });
    }

    let (sink, rx) = EventSink::channel(config.agent.event_queue_capacity, config.agent.overflow);
    let printer = tokio::spawn(print_events(rx));

    let result = backend.run(TaskRequest { prompt, workdir }, sink, cancel).await;
    let last = printer.await.context("event printer task")??;
    result?;
    Ok(last != Some(EventKind::Error))
}

fn build_backend(kind: BackendArg, config: &Config) -> Box<dyn Backend> {
    match kind {
        BackendArg::Native => {
            let model: Arc<dyn taskrun_model::ModelProvider> = Arc::from(taskrun_model::from_config(&config.provider));
            Box::new(NativeBackend::new(model, config.agent.clone(), config.sandbox.clone()))
        }
        BackendArg::Claude => Box::new(ClaudeBackend::new(config.backends.claude.clone())),
        BackendArg::Codex => Box::new(CodexBackend::new(config.backends.codex.clone())),
    }
}

/// Write each event as one JSON line on stdout until the producer is done.
/// Returns the kind of the last event seen.
async fn print_events(mut rx: mpsc::Receiver<StreamEvent>) -> anyhow::Result<Option<EventKind>> {
    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event.kind);
        let line = serde_json::to_string(&event).context("encoding event")?;
        let mut out = io::stdout().lock();
        writeln!(out, "{line}").context("writing to stdout")?;
        out.flush().context("flushing stdout")?;
    }
    Ok(last)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

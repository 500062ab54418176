// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use taskrun_config::{Config, ProviderKind};

/// Which engine executes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendArg {
    /// In-process tool-calling loop against the configured provider
    #[default]
    Native,
    /// Claude Code CLI (`claude -p --output-format stream-json`)
    Claude,
    /// Codex CLI (`codex exec --json`)
    Codex,
}

#[derive(Parser, Debug)]
#[command(
    name = "taskrun",
    about = "Run a coding task through an LLM agent and stream its events as JSON lines",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (merged on top of auto-discovered layers)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one task and print its events to stdout
    Run(RunArgs),
    /// Print the effective configuration and exit
    ShowConfig,
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(long, short = 'b', value_enum, default_value = "native")]
    pub backend: BackendArg,

    /// Directory the task operates in (default: current directory)
    #[arg(long, short = 'C', value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Wire format for the native backend
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Model override for the selected backend
    #[arg(long, short = 'M', env = "TASKRUN_MODEL")]
    pub model: Option<String>,

    /// Run shell commands directly instead of inside the bubblewrap jail
    #[arg(long)]
    pub no_sandbox: bool,

    /// Task description; `-` reads it from stdin
    #[arg(value_name = "PROMPT")]
    pub prompt: String,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(kind) = self.provider {
            config.provider.kind = kind;
        }
        if let Some(model) = &self.model {
            match self.backend {
                BackendArg::Native => config.provider.model = model.clone(),
                BackendArg::Claude => config.backends.claude.model = Some(model.clone()),
                BackendArg::Codex => config.backends.codex.model = Some(model.clone()),
            }
        }
        if self.no_sandbox {
            config.sandbox.enabled = false;
        }
    }

    pub fn read_prompt(&self) -> anyhow::Result<String> {
        let prompt = if self.prompt == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading prompt from stdin")?;
            buf
        } else {
            self.prompt.clone()
        };
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            anyhow::bail!("empty prompt");
        }
        Ok(prompt)
    }
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "taskrun", &mut std::io::stdout());
}

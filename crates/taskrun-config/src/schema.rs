// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
}

/// Wire format spoken by an LLM endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `/v1/messages` with `tool_use` / `tool_result` content blocks
    #[default]
    Anthropic,
    /// `/chat/completions` with `tool_calls` and `role: "tool"` answers
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Credentials and endpoint for the native HTTP loop.
///
/// The runtime never fetches credentials itself; whatever ends up in
/// `api_key` (or the named environment variable) is sent as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Full endpoint URL override.  When unset the kind's public endpoint is used.
    pub api_url: Option<String>,
    /// Value of the `anthropic-version` header (Anthropic only)
    pub api_version: Option<String>,
    /// Explicit API key; prefer `api_key_env` in version-controlled files
    pub api_key: Option<String>,
    /// Environment variable that holds the API key (read at runtime)
    pub api_key_env: Option<String>,
    /// Model name forwarded to the provider API
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens to request in a single completion
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    "claude-sonnet-4-5".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Anthropic,
            api_url: None,
            api_version: None,
            api_key: None,
            api_key_env: None,
            model: default_model(),
            max_tokens: Some(8192),
        }
    }
}

impl ProviderConfig {
    /// Endpoint the request is POSTed to.
    pub fn endpoint(&self) -> String {
        if let Some(url) = &self.api_url {
            return url.clone();
        }
        match self.kind {
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages".into(),
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions".into(),
        }
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or("2023-06-01")
    }

    /// Resolve the API key: explicit value, then the configured env var,
    /// then the canonical env var for the provider kind.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.api_key {
            return Some(k.clone());
        }
        if let Some(env) = &self.api_key_env {
            return std::env::var(env).ok();
        }
        let canonical = match self.kind {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        };
        std::env::var(canonical).ok()
    }
}

/// Policy for running shell commands issued by the `bash` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Use the namespace jail when the platform provides one
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Executables (base name) allowed to bypass the jail
    #[serde(default)]
    pub allowlist: Vec<String>,
    /// Hard wall-clock limit per command
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,
    /// Byte cap applied to each of stdout and stderr
    #[serde(default = "default_output_limit")]
    pub output_limit_bytes: usize,
}

fn default_sandbox_timeout() -> u64 {
    120
}
fn default_output_limit() -> usize {
    30_000
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowlist: vec!["git".into()],
            timeout_secs: default_sandbox_timeout(),
            output_limit_bytes: default_output_limit(),
        }
    }
}

impl SandboxConfig {
    pub fn is_command_allowed(&self, name: &str) -> bool {
        self.allowlist.iter().any(|a| a == name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What the producer does when a bounded event queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Await free capacity.  A dropped consumer closes the queue, which
    /// stops the producer rather than parking it forever.
    #[default]
    Block,
    /// Discard the event that did not fit and log it.
    DropNewest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,
    /// Characters of a tool result shown in the `result` event; history
    /// always keeps the full text
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
    /// Capacity of bounded event queues
    #[serde(default = "default_queue_capacity")]
    pub event_queue_capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_display_limit() -> usize {
    500
}
fn default_queue_capacity() -> usize {
    64
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            display_limit: default_display_limit(),
            event_queue_capacity: default_queue_capacity(),
            overflow: OverflowPolicy::Block,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "CliBackendConfig::claude")]
    pub claude: CliBackendConfig,
    #[serde(default = "CliBackendConfig::codex")]
    pub codex: CliBackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            claude: CliBackendConfig::claude(),
            codex: CliBackendConfig::codex(),
        }
    }
}

/// A CLI agent wrapped as a child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliBackendConfig {
    /// Executable name or path
    pub binary: String,
    /// Model passed through `--model`
    pub model: Option<String>,
    /// Extra arguments inserted before the prompt
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Extra environment variables for the child process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CliBackendConfig {
    pub fn claude() -> Self {
        Self { binary: "claude".into(), model: None, extra_args: vec![], env: HashMap::new() }
    }

    pub fn codex() -> Self {
        Self { binary: "codex".into(), model: None, extra_args: vec![], env: HashMap::new() }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_is_anthropic() {
        let c = Config::default();
        assert_eq!(c.provider.kind, ProviderKind::Anthropic);
        assert_eq!(c.provider.endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(c.provider.api_version(), "2023-06-01");
    }

    #[test]
    fn openai_endpoint_default() {
        let p = ProviderConfig { kind: ProviderKind::OpenAi, ..ProviderConfig::default() };
        assert_eq!(p.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn api_url_override_wins() {
        let p = ProviderConfig {
            api_url: Some("http://127.0.0.1:9/v1/messages".into()),
            ..ProviderConfig::default()
        };
        assert_eq!(p.endpoint(), "http://127.0.0.1:9/v1/messages");
    }

    #[test]
    fn explicit_api_key_wins_over_env() {
        let p = ProviderConfig {
            api_key: Some("sk-explicit".into()),
            api_key_env: Some("TASKRUN_TEST_UNSET_KEY_VAR".into()),
            ..ProviderConfig::default()
        };
        assert_eq!(p.resolve_api_key().as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn missing_named_env_var_resolves_to_none() {
        let p = ProviderConfig {
            api_key_env: Some("TASKRUN_TEST_UNSET_KEY_VAR_XYZ".into()),
            ..ProviderConfig::default()
        };
        assert!(p.resolve_api_key().is_none());
    }

    #[test]
    fn sandbox_defaults() {
        let s = SandboxConfig::default();
        assert!(s.enabled);
        assert_eq!(s.timeout(), Duration::from_secs(120));
        assert_eq!(s.output_limit_bytes, 30_000);
        assert!(s.is_command_allowed("git"));
        assert!(!s.is_command_allowed("rm"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let c: Config = toml::from_str("[provider]\nkind = \"openai\"\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(c.provider.kind, ProviderKind::OpenAi);
        assert_eq!(c.provider.model, "gpt-4o");
        assert_eq!(c.agent.event_queue_capacity, 64);
        assert_eq!(c.backends.claude.binary, "claude");
        assert_eq!(c.backends.codex.binary, "codex");
    }

    #[test]
    fn overflow_policy_parses_snake_case() {
        let c: Config = toml::from_str("[agent]\noverflow = \"drop_newest\"\n").unwrap();
        assert_eq!(c.agent.overflow, OverflowPolicy::DropNewest);
        assert_eq!(c.agent.display_limit, 500);
    }

    #[test]
    fn sandbox_allowlist_from_toml() {
        let c: Config = toml::from_str("[sandbox]\nallowlist = [\"git\", \"cargo\"]\ntimeout_secs = 5\n").unwrap();
        assert!(c.sandbox.is_command_allowed("cargo"));
        assert_eq!(c.sandbox.timeout_secs, 5);
        assert!(c.sandbox.enabled, "enabled must default to true");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut c = Config::default();
        c.backends.claude.model = Some("glm-4.6".into());
        let text = toml::to_string(&c).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.backends.claude.model.as_deref(), Some("glm-4.6"));
        assert_eq!(back.provider.model, c.provider.model);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::Path;

/// System prompt for the native loop.  A configured prompt replaces the
/// built-in text; the working directory line is always appended.
pub fn system_prompt(workdir: &Path, custom: Option<&str>) -> String {
    let body = custom.unwrap_or(DEFAULT_PROMPT);
    format!("{body}\n\nWorking directory: {}", workdir.display())
}

const DEFAULT_PROMPT: &str = "\
You are a software engineering agent working inside a project directory.
Use the tools to inspect and change files and to run commands. Paths are
relative to the working directory.

- Read a file before editing it; prefer edit or multiedit over rewriting.
- Use glob and grep to find code instead of listing directories by hand.
- For multi-step work keep the todos list current.
- When the task is finished, reply with a short summary and no tool calls.";

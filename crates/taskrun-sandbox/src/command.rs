// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

/// Name of the program a shell command line starts with, stripped of any
/// directory prefix.  Leading `VAR=value` assignments are skipped, so
/// `FOO=1 /usr/bin/git status` yields `git`.
pub fn base_executable(cmd: &str) -> Option<&str> {
    let first = cmd.split_whitespace().find(|tok| !is_assignment(tok))?;
    let first = first.trim_matches(|c| c == '"' || c == '\'');
    let base = first.rsplit('/').next().unwrap_or(first);
    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}

fn is_assignment(tok: &str) -> bool {
    match tok.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use taskrun_sandbox::Sandbox;

use crate::TodoState;

/// What the built-in tools of one task share: the working directory, the
/// shell sandbox and the todo list.
#[derive(Debug, Clone)]
pub struct ToolContext {
    workdir: PathBuf,
    sandbox: Sandbox,
    todos: TodoState,
}

impl ToolContext {
    pub fn new(workdir: impl Into<PathBuf>, sandbox: Sandbox) -> Self {
        Self { workdir: workdir.into(), sandbox, todos: TodoState::new() }
    }

    pub fn with_todos(mut self, todos: TodoState) -> Self {
        self.todos = todos;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn todos(&self) -> &TodoState {
        &self.todos
    }

    /// Relative paths are taken from the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.workdir.join(p)
        }
    }

    /// Display form of `path`: relative to the working directory when
    /// inside it, unchanged otherwise.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.workdir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

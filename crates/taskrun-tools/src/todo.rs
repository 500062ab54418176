// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "invalid status '{other}' (expected pending, in_progress or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    /// Present-tense label shown while the item is in progress.
    #[serde(rename = "activeForm", default)]
    pub active_form: String,
}

/// Transitions detected by [`TodoState::replace`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoUpdate {
    pub started: Vec<String>,
    pub completed: Vec<String>,
}

/// Per-task progress list.  Cloning yields another handle to the same list.
///
/// Writers go through [`replace`](Self::replace); every replacement is
/// broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct TodoState {
    items: Arc<RwLock<Vec<TodoItem>>>,
    tx: broadcast::Sender<Vec<TodoItem>>,
}

impl Default for TodoState {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoState {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { items: Arc::new(RwLock::new(Vec::new())), tx }
    }

    pub fn snapshot(&self) -> Vec<TodoItem> {
        match self.items.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<TodoItem>> {
        self.tx.subscribe()
    }

    /// Swap in `new` atomically and report which items just started or
    /// just completed, matching items by `content`.
    pub fn replace(&self, new: Vec<TodoItem>) -> TodoUpdate {
        let mut update = TodoUpdate::default();
        {
            let mut guard = match self.items.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            for item in &new {
                let before = guard.iter().find(|o| o.content == item.content).map(|o| o.status);
                match item.status {
                    TodoStatus::InProgress if before != Some(TodoStatus::InProgress) => {
                        update.started.push(item.content.clone())
                    }
                    TodoStatus::Completed if before != Some(TodoStatus::Completed) => {
                        update.completed.push(item.content.clone())
                    }
                    _ => {}
                }
            }
            *guard = new.clone();
        }
        // No subscribers is fine.
        let _ = self.tx.send(new);
        update
    }

    /// `N/M completed`, then any transitions, then the active item.
    pub fn summary(items: &[TodoItem], update: &TodoUpdate) -> String {
        let done = items.iter().filter(|i| i.status == TodoStatus::Completed).count();
        let mut lines = vec![format!("{done}/{} completed", items.len())];
        if !update.started.is_empty() {
            lines.push(format!("started: {}", update.started.join(", ")));
        }
        if !update.completed.is_empty() {
            lines.push(format!("completed: {}", update.completed.join(", ")));
        }
        if let Some(active) = items.iter().find(|i| i.status == TodoStatus::InProgress) {
            let label = if active.active_form.is_empty() { &active.content } else { &active.active_form };
            lines.push(format!("in progress: {label}"));
        }
        lines.join("\n")
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod args;
mod builtin;
mod context;
mod registry;
pub mod schema;
mod todo;
mod tool;

pub use args::parse_args;
pub use builtin::{
    BashTool, EditTool, GlobTool, GrepTool, LsTool, MultiEditTool, ReadTool, TodosTool, WriteTool,
};
pub use context::ToolContext;
pub use registry::ToolRegistry;
pub use todo::{TodoItem, TodoState, TodoStatus, TodoUpdate};
pub use tool::{Tool, ToolCall, ToolOutput};

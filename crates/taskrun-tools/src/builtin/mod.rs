// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod bash;
mod edit;
mod glob;
mod grep;
mod ls;
mod multiedit;
mod read;
mod todos;
mod write;

pub use bash::BashTool;
pub use edit::EditTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use ls::LsTool;
pub use multiedit::MultiEditTool;
pub use read::ReadTool;
pub use todos::TodosTool;
pub use write::WriteTool;

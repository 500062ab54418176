// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::de::DeserializeOwned;
use taskrun_core::StreamEvent;
use tracing::warn;

/// Turns one stdout line of an agent CLI into zero or more events.
///
/// `Line` is a tagged enum keyed by the CLI's discriminator field with a
/// catch-all variant, so unknown line types decode fine and map to no
/// events.  Decoders may keep state across lines (tool names by id, the
/// last assistant message).
pub trait LineDecoder: Send {
    type Line: DeserializeOwned;

    fn on_line(&mut self, line: Self::Line) -> Vec<StreamEvent>;

    /// Parse and translate a raw line.  Malformed JSON is an error the
    /// caller logs and skips.
    fn decode(&mut self, raw: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let line = serde_json::from_str(raw)?;
        Ok(self.on_line(line))
    }
}

/// Feed `lines` through `decoder` the same way the process runner does:
/// blank lines are ignored, undecodable lines are skipped with a warning.
pub fn decode_lines<D, I, S>(decoder: &mut D, lines: I) -> Vec<StreamEvent>
where
    D: LineDecoder,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        match decoder.decode(line) {
            Ok(events) => out.extend(events),
            Err(e) => warn!(error = %e, line = %preview(line), "skipping undecodable line"),
        }
    }
    out
}

/// First 120 chars of a line for log messages.
pub(crate) fn preview(line: &str) -> String {
    let mut s: String = line.chars().take(120).collect();
    if s.len() < line.len() {
        s.push('…');
    }
    s
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

/// Appended once when a stream hits its byte cap.
pub const TRUNCATION_MARKER: &str = "\n... [output truncated]\n";

/// Byte sink that keeps at most `limit` bytes, then appends
/// [`TRUNCATION_MARKER`] exactly once and discards everything after.
#[derive(Debug, Default)]
pub struct LimitedBuffer {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl LimitedBuffer {
    pub fn new(limit: usize) -> Self {
        Self { buf: Vec::new(), limit, truncated: false }
    }

    pub fn write(&mut self, data: &[u8]) {
        if self.truncated || data.is_empty() {
            return;
        }
        let room = self.limit.saturating_sub(self.buf.len());
        if data.len() <= room {
            self.buf.extend_from_slice(data);
            return;
        }
        self.buf.extend_from_slice(&data[..room]);
        self.buf.extend_from_slice(TRUNCATION_MARKER.as_bytes());
        self.truncated = true;
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Lossy UTF-8; a cut in the middle of a multi-byte character becomes U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

//! Incremental extraction of top-level JSON object members from streamed text.
//!
//! The model streams one JSON object, possibly after some prose. Each
//! top-level member is emitted as soon as its value finishes parsing, which
//! lets the client render fields before the whole object (and its validation)
//! is complete.

use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct FieldPatchExtractor {
    buf: String,
    /// Bytes of `buf` already scanned.
    scanned: usize,
    started: bool,
    finished: bool,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Start of the member currently being read.
    member_start: usize,
}

impl FieldPatchExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the members completed by it, in order.
    pub fn push(&mut self, chunk: &str) -> Vec<(String, Value)> {
        self.buf.push_str(chunk);
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        let bytes = self.buf.as_bytes();
        let mut i = self.scanned;
        while i < bytes.len() {
            let b = bytes[i];
            if !self.started {
                if b == b'{' {
                    self.started = true;
                    self.depth = 1;
                    self.member_start = i + 1;
                }
                i += 1;
                continue;
            }
            if self.in_string {
                match b {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                i += 1;
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        out.extend(parse_member(&self.buf[self.member_start..i]));
                        self.finished = true;
                        i += 1;
                        break;
                    }
                }
                b',' if self.depth == 1 => {
                    out.extend(parse_member(&self.buf[self.member_start..i]));
                    self.member_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        self.scanned = i;
        out
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.buf
    }
}

/// Parse one `"key": value` member by wrapping it in braces.
fn parse_member(member: &str) -> Vec<(String, Value)> {
    if member.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Map<String, Value>>(&format!("{{{member}}}")) {
        Ok(map) => map.into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

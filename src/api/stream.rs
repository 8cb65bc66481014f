use super::error::DecodeError;
use serde_json::Value;

const DONE_SENTINEL: &str = "[DONE]";
const DATA_PREFIX: &str = "data: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Chunk arrivals a deferred line may wait for before it is dropped.
    pub max_line_retries: u32,
    /// Buffered text above this size is treated as unrecoverable.
    pub max_buffer_bytes: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_line_retries: 8,
            max_buffer_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    Frame(Value),
    Malformed(DecodeError),
}

enum LineKind<'a> {
    Skip,
    Done,
    Payload(&'a str),
}

fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() || line.starts_with(':') {
        return LineKind::Skip;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return LineKind::Skip;
    };
    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        LineKind::Done
    } else {
        LineKind::Payload(payload)
    }
}

/// Incremental decoder for `data: {json}` event streams.
///
/// Single use: build a fresh parser for every request.
#[derive(Default)]
pub struct StreamParser {
    buffer: String,
    utf8_carry: Vec<u8>,
    limits: DecoderLimits,
    deferred: bool,
    head_retries: u32,
    done: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// True once a `[DONE]` line was seen.
    ///
    /// The parser stays finished from then on: bytes left in the chunk that
    /// carried `[DONE]` are discarded, and every later `process` or `finish`
    /// call returns nothing. The caller may keep reading the transport until
    /// it ends; nothing read after `[DONE]` reaches the conversation.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<DecodedLine> {
        let text = self.decode_utf8(chunk);
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buffer.push_str(&text);
        if self.deferred {
            self.head_retries += 1;
        }
        self.extract_lines(&mut out, false);
        self.enforce_buffer_limit(&mut out);
        out
    }

    /// Called at end of stream. A trailing unterminated line is parsed if it
    /// is complete JSON and silently dropped otherwise.
    pub fn finish(&mut self) -> Vec<DecodedLine> {
        let mut out = Vec::new();
        if !self.utf8_carry.is_empty() {
            self.utf8_carry.clear();
            if !self.done {
                self.buffer.push(char::REPLACEMENT_CHARACTER);
            }
        }
        if self.done {
            self.buffer.clear();
            return out;
        }

        self.extract_lines(&mut out, true);

        let remainder = std::mem::take(&mut self.buffer);
        let tail = remainder.strip_suffix('\r').unwrap_or(&remainder);
        if let LineKind::Payload(payload) = classify_line(tail) {
            match serde_json::from_str::<Value>(payload) {
                Ok(frame) => out.push(DecodedLine::Frame(frame)),
                Err(error) => {
                    tracing::debug!(%error, bytes = payload.len(), "discarding truncated trailing line");
                }
            }
        }
        out
    }

    fn extract_lines(&mut self, out: &mut Vec<DecodedLine>, final_pass: bool) {
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].find('\n') {
            let end = start + offset;
            let raw = &self.buffer[start..end];
            let line = raw.strip_suffix('\r').unwrap_or(raw);

            match classify_line(line) {
                LineKind::Skip => {}
                LineKind::Done => {
                    self.done = true;
                    start = end + 1;
                    break;
                }
                LineKind::Payload(payload) => match serde_json::from_str::<Value>(payload) {
                    Ok(frame) => {
                        out.push(DecodedLine::Frame(frame));
                        self.deferred = false;
                        self.head_retries = 0;
                    }
                    Err(error) => {
                        let over_budget = self.head_retries > self.limits.max_line_retries
                            || self.buffer.len() > self.limits.max_buffer_bytes;
                        if !final_pass && !over_budget {
                            // Leave the line at the buffer front and retry once more bytes arrive.
                            self.deferred = true;
                            break;
                        }
                        out.push(DecodedLine::Malformed(DecodeError {
                            line: line.to_string(),
                            retries: self.head_retries,
                            reason: error.to_string(),
                        }));
                        self.deferred = false;
                        self.head_retries = 0;
                    }
                },
            }

            start = end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        if self.done {
            self.buffer.clear();
        }
    }

    fn enforce_buffer_limit(&mut self, out: &mut Vec<DecodedLine>) {
        if self.buffer.len() <= self.limits.max_buffer_bytes {
            return;
        }
        let dropped = std::mem::take(&mut self.buffer);
        let preview: String = dropped.chars().take(120).collect();
        out.push(DecodedLine::Malformed(DecodeError {
            line: preview,
            retries: self.head_retries,
            reason: format!(
                "buffer exceeded {} bytes without a parseable line",
                self.limits.max_buffer_bytes
            ),
        }));
        self.deferred = false;
        self.head_retries = 0;
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut pending = std::mem::take(&mut self.utf8_carry);
        pending.extend_from_slice(chunk);

        let mut text = String::with_capacity(pending.len());
        let mut input = pending.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    input = &[];
                    break;
                }
                Err(error) => {
                    let (valid, rest) = input.split_at(error.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[invalid..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        self.utf8_carry = input.to_vec();
        text
    }
}

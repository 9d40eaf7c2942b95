use serde_json::Value;

use crate::events::{ChatStreamEvent, FinishReason};

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental parser for `data:`-prefixed SSE lines.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence; only
/// complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    ///
    /// Nothing after the `[DONE]` line is parsed, in this call or later ones.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatStreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=split).collect();
            let line = String::from_utf8_lossy(&line);
            events.extend(self.parse_line(&line));
            if self.done {
                self.buffer.clear();
                break;
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<ChatStreamEvent> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<ChatStreamEvent> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }

        let line = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&line);
        self.parse_line(&line).into_iter().collect()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }

    fn parse_line(&mut self, line: &str) -> Option<ChatStreamEvent> {
        let payload = line.trim().strip_prefix("data:")?.trim();
        if payload.is_empty() {
            return None;
        }

        if payload == DONE_SENTINEL {
            self.done = true;
            return Some(ChatStreamEvent::Done);
        }

        let value = serde_json::from_str::<Value>(payload).ok()?;
        map_event(&value)
    }
}

fn map_event(value: &Value) -> Option<ChatStreamEvent> {
    if let Some(error) = value.get("error") {
        return Some(ChatStreamEvent::Error {
            code: error
                .get("code")
                .and_then(|code| match code {
                    Value::String(code) => Some(code.clone()),
                    Value::Number(code) => Some(code.to_string()),
                    _ => None,
                }),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        });
    }

    let choice = value.get("choices")?.get(0)?;

    if let Some(delta) = choice
        .get("delta")
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|delta| !delta.is_empty())
    {
        return Some(ChatStreamEvent::ContentDelta {
            delta: delta.to_owned(),
        });
    }

    choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .and_then(FinishReason::parse)
        .map(|reason| ChatStreamEvent::Finished { reason })
}

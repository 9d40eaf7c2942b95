use serde::{Deserialize, Serialize};

/// Why the model stopped producing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

impl FinishReason {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "tool_calls" | "function_call" => Self::ToolCalls,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::ToolCalls => "tool_calls",
        }
    }
}

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// `choices[0].delta.content` of one chunk.
    ContentDelta { delta: String },
    /// `choices[0].finish_reason` of one chunk.
    Finished { reason: FinishReason },
    /// Top-level `error` object sent inside the stream.
    Error {
        code: Option<String>,
        message: Option<String>,
    },
    /// The `data: [DONE]` sentinel.
    Done,
}

impl ChatStreamEvent {
    /// Returns true for the end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

//! Transport-only client primitives for streaming chat-completion endpoints.
//!
//! This crate owns request building, header assembly, SSE parsing, and retry
//! behavior for OpenAI-compatible `/chat/completions` endpoints (including
//! Azure AI Inference deployments). It contains no conversation model and no
//! presentation coupling.
//!
//! Streams are delivered incrementally through
//! [`ChatCompletionsClient::stream_with_handler`]: each `data:` line becomes a
//! [`ChatStreamEvent`] as soon as its bytes arrive.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, ChatCompletionsClient, StreamResult};
pub use config::ChatCompletionsConfig;
pub use error::ChatCompletionsError;
pub use events::{ChatStreamEvent, FinishReason};
pub use reqwest::StatusCode;
pub use payload::{ChatCompletionRequest, ChatMessage};
pub use sse::SseStreamParser;
pub use url::normalize_chat_completions_url;

//! Minimal transport-agnostic contract for producing one streamed reply.
//!
//! This crate defines only the request shape, the ordered event lifecycle of a
//! single generation stream, and the transport trait. It excludes wire
//! protocols, HTTP details, and anything about how replies are stored.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

/// Identifier for one generation stream.
pub type StreamId = u64;

/// Shared cancellation flag for a stream.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a transport before any stream starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInitError {
    message: String,
}

impl TransportInitError {
    /// Creates a new transport initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportInitError {}

impl From<String> for TransportInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TransportInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Speaker of one history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Wire name used by chat-style endpoints.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One model-facing message of the linear history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

impl HistoryMessage {
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Input required to start a generation stream.
///
/// `history` is the ancestor chain from the conversation root down to the
/// prompt being answered, oldest first. Branch siblings never appear in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub stream_id: StreamId,
    pub history: Vec<HistoryMessage>,
    pub highlighted_context: Option<String>,
}

impl GenerationRequest {
    /// Returns the message list a chat endpoint should receive.
    ///
    /// A highlighted context is carried as a leading system message.
    #[must_use]
    pub fn messages(&self) -> Vec<HistoryMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        if let Some(context) = self
            .highlighted_context
            .as_deref()
            .filter(|context| !context.trim().is_empty())
        {
            messages.push(HistoryMessage::system(context_instructions(context)));
        }
        messages.extend(self.history.iter().cloned());
        messages
    }

    /// Returns the content of the most recent user message, if any.
    #[must_use]
    pub fn last_user_prompt(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::User)
            .map(|message| message.content.as_str())
    }
}

/// System instructions used when a reply follows up on highlighted text.
#[must_use]
pub fn context_instructions(context: &str) -> String {
    format!(
        "You are a helpful assistant. Provide a concise follow-up based on the following context: \"{context}\". Use Markdown and LaTeX where appropriate."
    )
}

/// Transport-emitted lifecycle event for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Started { stream_id: StreamId },
    Fragment { stream_id: StreamId, text: String },
    Finished { stream_id: StreamId },
    Failed { stream_id: StreamId, error: String },
    Cancelled { stream_id: StreamId },
}

impl GenerationEvent {
    /// Returns the stream identifier associated with this event.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Started { stream_id }
            | Self::Fragment { stream_id, .. }
            | Self::Finished { stream_id }
            | Self::Failed { stream_id, .. }
            | Self::Cancelled { stream_id } => *stream_id,
        }
    }

    /// Returns true when this event terminates the stream lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Immutable metadata describing a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProfile {
    pub transport_id: String,
    pub model_id: String,
}

/// Transport interface for producing one streamed reply.
pub trait GenerationTransport: Send + Sync + 'static {
    /// Returns transport/model identity metadata.
    fn profile(&self) -> TransportProfile;

    /// Cycles to the next model selection for future streams.
    ///
    /// Transports may return an error when model cycling is unsupported.
    fn cycle_model(&self) -> Result<TransportProfile, String> {
        Err("Model cycling is not supported by this transport".to_string())
    }

    /// Produces a reply for `req`, emitting lifecycle events in delivery order.
    ///
    /// At most one terminal event is emitted. Returning `Err` reports a
    /// transport failure that happened outside the event stream.
    fn generate(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String>;
}

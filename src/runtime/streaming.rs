//! Applying one generation stream to its assistant node.

use std::fmt;

use generation::{GenerationEvent, StreamId};

use crate::conversation::{ConversationError, ConversationState, NodeId};
use crate::runtime::observer::ChangeEvent;

const PANIC_MESSAGE: &str = "generation transport panicked";

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    /// The transport returned without a terminal event; partial content stays.
    EndedEarly,
    Failed(ConversationError),
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::EndedEarly => f.write_str("ended early"),
            Self::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

/// Why the transport call returned control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamClose {
    Returned(Result<(), String>),
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub stream_id: StreamId,
    pub node_id: NodeId,
    pub outcome: StreamOutcome,
    pub fragments: usize,
}

/// A committed transition: the next snapshot and what changed.
pub type Transition = Option<(ConversationState, ChangeEvent)>;

/// Turns transport events for one stream into snapshot transitions.
///
/// Fragments are appended in delivery order and counted as output tokens.
/// A failure appends a visible error marker after whatever was streamed.
/// Events for other streams or after the terminal one are dropped.
#[derive(Debug, Clone)]
pub struct StreamingCoordinator {
    stream_id: StreamId,
    node_id: NodeId,
    fragments: usize,
    outcome: Option<StreamOutcome>,
}

impl StreamingCoordinator {
    #[must_use]
    pub fn new(stream_id: StreamId, node_id: NodeId) -> Self {
        Self {
            stream_id,
            node_id,
            fragments: 0,
            outcome: None,
        }
    }

    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn apply(
        &mut self,
        state: &ConversationState,
        event: GenerationEvent,
    ) -> Result<Transition, ConversationError> {
        if event.stream_id() != self.stream_id {
            tracing::warn!(
                stream_id = self.stream_id,
                event_stream_id = event.stream_id(),
                "dropping event for another stream"
            );
            return Ok(None);
        }
        if self.outcome.is_some() {
            tracing::warn!(
                stream_id = self.stream_id,
                ?event,
                "dropping event after terminal event"
            );
            return Ok(None);
        }

        match event {
            GenerationEvent::Started { stream_id } => Ok(Some((
                state.clone(),
                ChangeEvent::StreamStarted {
                    stream_id,
                    node_id: self.node_id.clone(),
                },
            ))),
            GenerationEvent::Fragment { text, .. } => {
                if text.is_empty() {
                    return Ok(None);
                }
                let next = state.with_appended_content(&self.node_id, &text)?;
                self.fragments += 1;
                tracing::trace!(
                    stream_id = self.stream_id,
                    node_id = %self.node_id,
                    fragment_len = text.len(),
                    "appended fragment"
                );
                Ok(Some((
                    next,
                    ChangeEvent::ContentAppended {
                        node_id: self.node_id.clone(),
                        fragment_len: text.len(),
                    },
                )))
            }
            GenerationEvent::Finished { .. } => {
                self.outcome = Some(StreamOutcome::Completed);
                Ok(None)
            }
            GenerationEvent::Cancelled { .. } => {
                self.outcome = Some(StreamOutcome::Cancelled);
                Ok(None)
            }
            GenerationEvent::Failed { error, .. } => self.fail(state, error).map(Some),
        }
    }

    /// Settle the stream once the transport call has returned.
    pub fn close(
        &mut self,
        state: &ConversationState,
        reason: StreamClose,
    ) -> Result<Transition, ConversationError> {
        if self.outcome.is_some() {
            if reason != StreamClose::Returned(Ok(())) {
                tracing::debug!(
                    stream_id = self.stream_id,
                    ?reason,
                    "ignoring transport result after terminal event"
                );
            }
            return Ok(None);
        }

        match reason {
            StreamClose::Returned(Ok(())) => {
                tracing::warn!(
                    stream_id = self.stream_id,
                    node_id = %self.node_id,
                    "transport ended without a terminal event"
                );
                self.outcome = Some(StreamOutcome::EndedEarly);
                Ok(None)
            }
            StreamClose::Returned(Err(error)) => self.fail(state, error).map(Some),
            StreamClose::Panicked => self.fail(state, PANIC_MESSAGE.to_owned()).map(Some),
        }
    }

    /// Outcome so far; `EndedEarly` until something terminal was seen.
    #[must_use]
    pub fn report(&self) -> StreamReport {
        StreamReport {
            stream_id: self.stream_id,
            node_id: self.node_id.clone(),
            outcome: self.outcome.clone().unwrap_or(StreamOutcome::EndedEarly),
            fragments: self.fragments,
        }
    }

    fn fail(
        &mut self,
        state: &ConversationState,
        message: String,
    ) -> Result<(ConversationState, ChangeEvent), ConversationError> {
        tracing::warn!(
            stream_id = self.stream_id,
            node_id = %self.node_id,
            error = %message,
            "generation failed"
        );
        let next = state.with_error_marker(&self.node_id, &message)?;
        let appended = next
            .node(&self.node_id)
            .map_or(0, |node| node.content.len())
            .saturating_sub(state.node(&self.node_id).map_or(0, |node| node.content.len()));
        self.outcome = Some(StreamOutcome::Failed(ConversationError::TransportFailure {
            node_id: self.node_id.clone(),
            message,
        }));
        Ok((
            next,
            ChangeEvent::ContentAppended {
                node_id: self.node_id.clone(),
                fragment_len: appended,
            },
        ))
    }
}

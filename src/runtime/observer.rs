use generation::StreamId;

use crate::conversation::{ConversationState, NodeId, Position};
use crate::runtime::streaming::StreamOutcome;

/// What changed in one snapshot transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    NodesInserted {
        user_id: NodeId,
        assistant_id: NodeId,
    },
    ContentAppended {
        node_id: NodeId,
        fragment_len: usize,
    },
    CollapseToggled {
        node_id: NodeId,
        collapsed: bool,
    },
    NodeMoved {
        node_id: NodeId,
        position: Position,
    },
    PositionCleared {
        node_id: NodeId,
    },
    HeightChanged {
        node_id: NodeId,
        height: f64,
    },
    StreamStarted {
        stream_id: StreamId,
        node_id: NodeId,
    },
    StreamFinished {
        stream_id: StreamId,
        node_id: NodeId,
        outcome: StreamOutcome,
    },
}

impl ChangeEvent {
    /// The node the change is about; for insertions, the new user node.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        match self {
            Self::NodesInserted { user_id, .. } => user_id,
            Self::ContentAppended { node_id, .. }
            | Self::CollapseToggled { node_id, .. }
            | Self::NodeMoved { node_id, .. }
            | Self::PositionCleared { node_id }
            | Self::HeightChanged { node_id, .. }
            | Self::StreamStarted { node_id, .. }
            | Self::StreamFinished { node_id, .. } => node_id,
        }
    }

    /// True when consumers should recompute layout for this change.
    #[must_use]
    pub fn affects_layout(&self) -> bool {
        !matches!(
            self,
            Self::StreamStarted { .. } | Self::StreamFinished { .. }
        )
    }
}

/// Receives every committed change, in commit order.
///
/// Called without any controller lock held, so observers may read or mutate
/// the controller. `snapshot` is the state right after the change.
pub trait ConversationObserver: Send + Sync {
    fn on_change(&self, snapshot: &ConversationState, event: &ChangeEvent);
}

impl<F> ConversationObserver for F
where
    F: Fn(&ConversationState, &ChangeEvent) + Send + Sync,
{
    fn on_change(&self, snapshot: &ConversationState, event: &ChangeEvent) {
        self(snapshot, event);
    }
}

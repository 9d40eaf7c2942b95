use thiserror::Error;

use super::node::NodeId;

/// Failures of conversation-tree operations.
///
/// Every structural variant is returned before any mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("parent node '{0}' does not exist")]
    ParentNotFound(NodeId),

    #[error("the conversation already has root node '{existing}'")]
    InvalidRootReassignment { existing: NodeId },

    #[error("node '{0}' does not exist")]
    NodeNotFound(NodeId),

    #[error("node id '{0}' is already in use")]
    DuplicateNodeId(NodeId),

    #[error("prompt text must not be empty")]
    EmptyPrompt,

    #[error("highlighted text must not be empty")]
    EmptyHighlight,

    #[error("a branch needs a parent node to anchor its highlighted text")]
    BranchWithoutParent,

    #[error("highlighted text '{highlighted_text}' does not occur in node '{parent_id}'")]
    HighlightNotInParent {
        parent_id: NodeId,
        highlighted_text: String,
    },

    #[error("invalid geometry for node '{node_id}': {detail}")]
    InvalidGeometry { node_id: NodeId, detail: String },

    #[error("generation failed for node '{node_id}': {message}")]
    TransportFailure { node_id: NodeId, message: String },
}

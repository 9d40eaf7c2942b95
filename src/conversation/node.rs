use std::fmt;

use generation::MessageRole;
use uuid::Uuid;

/// Opaque unique identity of a message node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Creates an id from an existing string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random (UUID v4) id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// Canvas coordinates of a node's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One message in the conversation tree.
///
/// `children_ids` order is display order. `highlighted_text` is only set on
/// branch nodes and names the excerpt of the parent that motivated them.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    pub id: NodeId,
    pub role: Role,
    pub content: String,
    pub parent_id: Option<NodeId>,
    pub children_ids: Vec<NodeId>,
    pub is_branch: bool,
    pub highlighted_text: Option<String>,
    pub is_collapsed: bool,
    pub height: Option<f64>,
    pub position: Option<Position>,
}

impl MessageNode {
    pub(crate) fn new(id: NodeId, role: Role, content: String, parent_id: Option<NodeId>) -> Self {
        Self {
            id,
            role,
            content,
            parent_id,
            children_ids: Vec::new(),
            is_branch: false,
            highlighted_text: None,
            is_collapsed: false,
            height: None,
            position: None,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

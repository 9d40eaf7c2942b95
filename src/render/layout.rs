//! Pillar layout of the conversation tree.
//!
//! Non-branch children continue their parent's column downwards. Branch
//! children open a new column one `column_width` to the right, stacked from
//! the parent's own row. The pass is a pure function of the snapshot.

use std::collections::BTreeMap;

use crate::conversation::{ConversationState, MessageNode, NodeId, Position};

pub const COLUMN_WIDTH: f64 = 650.0;
pub const NODE_SPACING: f64 = 40.0;
pub const NODE_HEIGHT_ESTIMATE: f64 = 200.0;
pub const BRANCH_SPACING: f64 = NODE_SPACING * 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub column_width: f64,
    pub node_spacing: f64,
    /// Height assumed for unmeasured nodes, and the minimum subtree extent.
    pub node_height_estimate: f64,
    pub branch_spacing: f64,
    /// Where the root is placed when it has no manual override.
    pub origin: Position,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_width: COLUMN_WIDTH,
            node_spacing: NODE_SPACING,
            node_height_estimate: NODE_HEIGHT_ESTIMATE,
            branch_spacing: BRANCH_SPACING,
            origin: Position::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    /// Parent and child share a column.
    Vertical,
    /// Child opens a new column to the right.
    Branch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: ConnectorKind,
}

/// Coordinates for every visible node plus the edges between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    positions: BTreeMap<NodeId, Position>,
    connectors: Vec<Connector>,
    extent: f64,
}

impl Layout {
    #[must_use]
    pub fn position(&self, id: &NodeId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub fn positions(&self) -> &BTreeMap<NodeId, Position> {
        &self.positions
    }

    /// Parent-to-child edges in placement order.
    #[must_use]
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// Vertical space used by the whole tree, measured from the root.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.extent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.positions.contains_key(id)
    }
}

/// Lay out every node reachable from the root.
///
/// Collapsed nodes are placed but their descendants are not. Manual
/// overrides replace a node's computed position and become the anchor for
/// its subtree. Dangling child ids are skipped.
#[must_use]
pub fn compute_layout(state: &ConversationState, config: &LayoutConfig) -> Layout {
    let mut pass = LayoutPass {
        state,
        config,
        layout: Layout::default(),
    };

    if let Some(root) = state.root() {
        let origin = config.origin;
        pass.layout.extent = pass.place(root, None, origin.x, origin.y);
    }

    tracing::trace!(
        nodes = pass.layout.positions.len(),
        extent = pass.layout.extent,
        version = state.version(),
        "computed layout"
    );
    pass.layout
}

struct LayoutPass<'a> {
    state: &'a ConversationState,
    config: &'a LayoutConfig,
    layout: Layout,
}

impl<'a> LayoutPass<'a> {
    /// Place `node` and its visible subtree; returns the vertical extent used.
    fn place(
        &mut self,
        node: &'a MessageNode,
        parent: Option<(&NodeId, ConnectorKind)>,
        x: f64,
        y: f64,
    ) -> f64 {
        if self.layout.positions.contains_key(&node.id) {
            tracing::warn!(node_id = %node.id, "node reached twice during layout");
            return 0.0;
        }

        let anchor = node.position.unwrap_or(Position::new(x, y));
        self.layout.positions.insert(node.id.clone(), anchor);
        if let Some((from, kind)) = parent {
            self.layout.connectors.push(Connector {
                from: from.clone(),
                to: node.id.clone(),
                kind,
            });
        }

        let config = self.config;
        let own_height = node
            .height
            .filter(|height| height.is_finite() && *height > 0.0)
            .unwrap_or(config.node_height_estimate);

        let mut cursor = anchor.y + own_height + config.node_spacing;
        let mut max_y = cursor;

        if !node.is_collapsed {
            let state = self.state;

            for child in state.children(&node.id).filter(|child| !child.is_branch) {
                let used = self.place(
                    child,
                    Some((&node.id, ConnectorKind::Vertical)),
                    anchor.x,
                    cursor,
                );
                cursor += used + config.node_spacing;
                max_y = max_y.max(cursor);
            }

            let mut branch_cursor = anchor.y;
            for child in state.branch_children(&node.id) {
                let used = self.place(
                    child,
                    Some((&node.id, ConnectorKind::Branch)),
                    anchor.x + config.column_width,
                    branch_cursor,
                );
                branch_cursor += used + config.branch_spacing;
                max_y = max_y.max(branch_cursor);
            }
        }

        (max_y - anchor.y).max(config.node_height_estimate)
    }
}

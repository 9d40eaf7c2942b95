use std::collections::BTreeMap;
use std::sync::Arc;

use generation::HistoryMessage;

use super::error::ConversationError;
use super::node::{MessageNode, NodeId, Position, Role};
use super::tokens::TokenStats;
use crate::markup::{split_thinking, visible_text};
use crate::render::anchors::find_case_insensitive;

const ERROR_MARKER_PREFIX: &str = "\n\n**Error:** ";

/// Text appended to a reply whose generation failed.
#[must_use]
pub fn error_marker(message: &str) -> String {
    format!("{ERROR_MARKER_PREFIX}{message}")
}

/// Ids for the user/assistant pair created by one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptPairIds {
    pub user: NodeId,
    pub assistant: NodeId,
}

impl PromptPairIds {
    #[must_use]
    pub fn new(user: impl Into<NodeId>, assistant: impl Into<NodeId>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    #[must_use]
    pub fn generate() -> Self {
        Self {
            user: NodeId::generate(),
            assistant: NodeId::generate(),
        }
    }
}

/// Immutable snapshot of the conversation tree and its token totals.
///
/// Every `with_*` operation validates first and returns a new snapshot;
/// `self` is never touched, so a rejected operation leaves nothing behind.
/// Nodes are shared between snapshots and copied only when changed.
/// `version` increases with every effective change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    nodes: Arc<BTreeMap<NodeId, Arc<MessageNode>>>,
    root_id: Option<NodeId>,
    tokens: TokenStats,
    version: u64,
}

impl ConversationState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn root_id(&self) -> Option<&NodeId> {
        self.root_id.as_ref()
    }

    #[must_use]
    pub fn root(&self) -> Option<&MessageNode> {
        self.root_id.as_ref().and_then(|id| self.node(id))
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&MessageNode> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.values().map(Arc::as_ref)
    }

    #[must_use]
    pub fn tokens(&self) -> TokenStats {
        self.tokens
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Children of `id` in display order. Dangling child ids are skipped.
    pub fn children<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a MessageNode> + 'a {
        self.node(id)
            .map_or(&[][..], |node| node.children_ids.as_slice())
            .iter()
            .filter_map(move |child_id| self.node(child_id))
    }

    pub fn branch_children<'a>(
        &'a self,
        id: &NodeId,
    ) -> impl Iterator<Item = &'a MessageNode> + 'a {
        self.children(id).filter(|child| child.is_branch)
    }

    /// Every node below `id`, depth first in display order.
    #[must_use]
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self
            .node(id)
            .map(|node| node.children_ids.iter().rev().collect())
            .unwrap_or_default();

        while let Some(next) = stack.pop() {
            let Some(node) = self.node(next) else {
                continue;
            };
            if out.contains(&node.id) {
                continue;
            }
            out.push(node.id.clone());
            stack.extend(node.children_ids.iter().rev());
        }
        out
    }

    /// Messages on the path from the root down to `id`, oldest first.
    ///
    /// Only ancestors are included; siblings and other branches are not.
    pub fn history_to(&self, id: &NodeId) -> Result<Vec<HistoryMessage>, ConversationError> {
        let mut chain = Vec::new();
        let mut cursor = Some(
            self.node(id)
                .ok_or_else(|| ConversationError::NodeNotFound(id.clone()))?,
        );

        while let Some(node) = cursor {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(HistoryMessage::new(node.role.into(), node.content.clone()));
            cursor = node.parent_id.as_ref().and_then(|parent| self.node(parent));
        }

        chain.reverse();
        Ok(chain)
    }

    /// Insert a user prompt and its empty assistant reply under `parent_id`.
    ///
    /// Without a parent the prompt becomes the root, which is allowed once.
    /// With `highlighted_text` the prompt is a branch; the excerpt is stored
    /// as given and must occur in the parent's answer, raw or rendered.
    /// Root and parent problems are reported before problems with the text. Input tokens are
    /// counted here, over the excerpt and the prompt together.
    pub fn with_prompt_pair(
        &self,
        parent_id: Option<&NodeId>,
        prompt: &str,
        highlighted_text: Option<&str>,
        ids: &PromptPairIds,
    ) -> Result<Self, ConversationError> {
        let highlight = highlighted_text;
        let parent = match parent_id {
            None => {
                if let Some(existing) = &self.root_id {
                    return Err(ConversationError::InvalidRootReassignment {
                        existing: existing.clone(),
                    });
                }
                if highlight.is_some() {
                    return Err(ConversationError::BranchWithoutParent);
                }
                None
            }
            Some(id) => Some(
                self.node(id)
                    .ok_or_else(|| ConversationError::ParentNotFound(id.clone()))?,
            ),
        };

        if prompt.trim().is_empty() {
            return Err(ConversationError::EmptyPrompt);
        }
        if highlight.is_some_and(|text| text.trim().is_empty()) {
            return Err(ConversationError::EmptyHighlight);
        }

        if ids.user == ids.assistant {
            return Err(ConversationError::DuplicateNodeId(ids.assistant.clone()));
        }
        for id in [&ids.user, &ids.assistant] {
            if self.contains(id) {
                return Err(ConversationError::DuplicateNodeId(id.clone()));
            }
        }

        if let (Some(parent), Some(highlight)) = (parent, highlight) {
            if !highlight_occurs_in(&parent.content, highlight) {
                return Err(ConversationError::HighlightNotInParent {
                    parent_id: parent.id.clone(),
                    highlighted_text: highlight.to_owned(),
                });
            }
        }

        let mut user = MessageNode::new(
            ids.user.clone(),
            Role::User,
            prompt.to_owned(),
            parent_id.cloned(),
        );
        user.is_branch = highlight.is_some();
        user.highlighted_text = highlight.map(str::to_owned);
        user.children_ids.push(ids.assistant.clone());

        let assistant = MessageNode::new(
            ids.assistant.clone(),
            Role::Assistant,
            String::new(),
            Some(ids.user.clone()),
        );

        let mut next = self.clone();
        let nodes = Arc::make_mut(&mut next.nodes);
        if let Some(parent) = parent_id.and_then(|id| nodes.get_mut(id)) {
            Arc::make_mut(parent).children_ids.push(ids.user.clone());
        }
        nodes.insert(ids.user.clone(), Arc::new(user));
        nodes.insert(ids.assistant.clone(), Arc::new(assistant));
        if parent_id.is_none() {
            next.root_id = Some(ids.user.clone());
        }
        next.tokens = next.tokens.with_prompt(highlight, prompt);
        next.version += 1;
        Ok(next)
    }

    /// [`Self::with_prompt_pair`] with freshly generated ids.
    pub fn submit_prompt(
        &self,
        parent_id: Option<&NodeId>,
        prompt: &str,
        highlighted_text: Option<&str>,
    ) -> Result<(Self, PromptPairIds), ConversationError> {
        let ids = PromptPairIds::generate();
        let next = self.with_prompt_pair(parent_id, prompt, highlighted_text, &ids)?;
        Ok((next, ids))
    }

    pub fn with_collapse_toggled(&self, id: &NodeId) -> Result<Self, ConversationError> {
        self.with_node_updated(id, |node| node.is_collapsed = !node.is_collapsed)
    }

    /// Pin `id` at `position`. The override stays until cleared explicitly.
    pub fn with_position(&self, id: &NodeId, position: Position) -> Result<Self, ConversationError> {
        if !position.is_finite() {
            return Err(ConversationError::InvalidGeometry {
                node_id: id.clone(),
                detail: format!("position ({}, {}) is not finite", position.x, position.y),
            });
        }
        self.with_node_updated(id, |node| node.position = Some(position))
    }

    pub fn without_position(&self, id: &NodeId) -> Result<Self, ConversationError> {
        self.with_node_updated(id, |node| node.position = None)
    }

    /// Record a measured height. An unchanged height returns an equal snapshot
    /// with the same version.
    pub fn with_height(&self, id: &NodeId, height: f64) -> Result<Self, ConversationError> {
        if !height.is_finite() || height < 0.0 {
            return Err(ConversationError::InvalidGeometry {
                node_id: id.clone(),
                detail: format!("height {height} is not a finite non-negative value"),
            });
        }
        let node = self
            .node(id)
            .ok_or_else(|| ConversationError::NodeNotFound(id.clone()))?;
        if node.height == Some(height) {
            return Ok(self.clone());
        }
        self.with_node_updated(id, |node| node.height = Some(height))
    }

    /// Append a streamed fragment and count its output tokens.
    pub fn with_appended_content(
        &self,
        id: &NodeId,
        fragment: &str,
    ) -> Result<Self, ConversationError> {
        let mut next = self.with_node_updated(id, |node| node.content.push_str(fragment))?;
        next.tokens = next.tokens.with_fragment(fragment);
        Ok(next)
    }

    /// Append a visible failure note. Not counted as output tokens.
    pub fn with_error_marker(&self, id: &NodeId, message: &str) -> Result<Self, ConversationError> {
        let marker = error_marker(message);
        self.with_node_updated(id, |node| node.content.push_str(&marker))
    }

    fn with_node_updated<F>(&self, id: &NodeId, update: F) -> Result<Self, ConversationError>
    where
        F: FnOnce(&mut MessageNode),
    {
        if !self.contains(id) {
            return Err(ConversationError::NodeNotFound(id.clone()));
        }

        let mut next = self.clone();
        if let Some(node) = Arc::make_mut(&mut next.nodes).get_mut(id) {
            update(Arc::make_mut(node));
        }
        next.version += 1;
        Ok(next)
    }
}

/// Checked against the answer only; a `<think>` section is never shown.
fn highlight_occurs_in(content: &str, highlight: &str) -> bool {
    let answer = split_thinking(content).answer;
    find_case_insensitive(answer, highlight).is_some()
        || find_case_insensitive(&visible_text(content), highlight).is_some()
}

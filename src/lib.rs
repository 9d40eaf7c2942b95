//! Branching conversation canvas.
//!
//! Invariant: single writer. Only [`ConversationController`] replaces the
//! conversation snapshot; everything else reads immutable
//! [`ConversationState`] values.
//!
//! # Public API Overview
//! - Model the tree with [`ConversationState`], whose operations validate
//!   first and return a new snapshot.
//! - Place nodes with [`compute_layout`] and anchor branches in their parent
//!   text with [`match_anchors`].
//! - Drive prompts and streamed replies through [`ConversationController`]
//!   and any [`generation::GenerationTransport`].
//! - Subscribe to [`ChangeEvent`]s with a [`ConversationObserver`].
//! - Install diagnostics with [`logging::init_logging`].

pub mod config;
pub mod conversation;
pub mod logging;
pub mod markup;
pub mod render;
pub mod runtime;

pub use crate::config::EnvConfig;
pub use crate::conversation::{
    estimate_tokens, sample_conversation, ConversationError, ConversationState, MessageNode,
    NodeId, Position, PromptPairIds, Role, TokenStats,
};
pub use crate::markup::{rendered_text, split_thinking, visible_text, ThinkingSplit};
pub use crate::render::{
    branch_anchors, compute_layout, match_anchors, AnchorMatch, BranchClaim, Connector,
    ConnectorKind, Layout, LayoutConfig, Segment,
};
pub use crate::runtime::{
    ChangeEvent, ConversationController, ConversationObserver, RenderedAnchors, StreamOutcome,
    StreamReport, Submission,
};

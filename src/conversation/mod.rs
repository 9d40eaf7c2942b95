//! The conversation tree: node records, snapshots and token accounting.

mod error;
mod node;
mod sample;
mod state;
mod tokens;

pub use error::ConversationError;
pub use node::{MessageNode, NodeId, Position, Role};
pub use sample::sample_conversation;
pub use state::{error_marker, ConversationState, PromptPairIds};
pub use tokens::{estimate_tokens, TokenStats};

//! Read-only projections of markdown message content.

pub mod plain;
pub mod thinking;

pub use plain::{rendered_text, visible_text};
pub use thinking::{split_thinking, ThinkingSplit};

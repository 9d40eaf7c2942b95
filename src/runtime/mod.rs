//! Controller, stream coordination and change notification.

pub mod controller;
pub mod observer;
pub mod streaming;

pub use controller::{ConversationController, RenderedAnchors, Submission};
pub use observer::{ChangeEvent, ConversationObserver};
pub use streaming::{StreamClose, StreamOutcome, StreamReport, StreamingCoordinator};

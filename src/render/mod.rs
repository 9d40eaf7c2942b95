//! Derived views over a conversation snapshot: layout and branch anchors.

pub mod anchors;
pub mod layout;

pub use anchors::{branch_anchors, match_anchors, AnchorMatch, BranchClaim, Segment};
pub use layout::{compute_layout, Connector, ConnectorKind, Layout, LayoutConfig};

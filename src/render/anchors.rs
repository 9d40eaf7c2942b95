//! Branch anchoring: which span of a parent's text each branch child points at.

use std::ops::Range;

use crate::conversation::{ConversationState, NodeId};

/// A branch child's claim on its parent's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchClaim<'a> {
    pub node_id: &'a NodeId,
    pub highlighted_text: &'a str,
}

/// One piece of the parent text, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(Range<usize>),
    Anchor { node_id: NodeId, range: Range<usize> },
}

impl Segment {
    #[must_use]
    pub fn range(&self) -> &Range<usize> {
        match self {
            Self::Text(range) | Self::Anchor { range, .. } => range,
        }
    }

    /// The slice of `source` covered by this segment.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range().clone()]
    }
}

/// Result of anchoring a set of branch claims in one text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnchorMatch {
    /// Non-empty, non-overlapping segments covering the whole text in order.
    pub segments: Vec<Segment>,
    /// Claims whose text was not found; they simply get no anchor.
    pub unmatched: Vec<NodeId>,
}

impl AnchorMatch {
    /// Iterate the matched anchors as `(node id, byte range)`.
    pub fn anchors(&self) -> impl Iterator<Item = (&NodeId, &Range<usize>)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Anchor { node_id, range } => Some((node_id, range)),
            Segment::Text(_) => None,
        })
    }

    #[must_use]
    pub fn anchor_for(&self, node_id: &NodeId) -> Option<&Range<usize>> {
        self.anchors()
            .find(|(candidate, _)| *candidate == node_id)
            .map(|(_, range)| range)
    }
}

/// Anchor each claim at its first case-insensitive occurrence in `text`.
///
/// Longer highlights are placed first (stable for equal lengths) so a short
/// phrase nested inside a longer one cannot fragment it. Each placement
/// splits the segment it lands in; later claims only search the remaining
/// plain-text segments.
#[must_use]
pub fn match_anchors(text: &str, claims: &[BranchClaim<'_>]) -> AnchorMatch {
    let mut ordered: Vec<&BranchClaim<'_>> = claims.iter().collect();
    ordered.sort_by_key(|claim| std::cmp::Reverse(claim.highlighted_text.chars().count()));

    let mut segments = vec![Segment::Text(0..text.len())];
    let mut unmatched = Vec::new();

    for claim in ordered {
        if claim.highlighted_text.is_empty() {
            continue;
        }

        let placed = segments.iter().enumerate().find_map(|(index, segment)| {
            let Segment::Text(range) = segment else {
                return None;
            };
            find_case_insensitive(&text[range.clone()], claim.highlighted_text).map(|found| {
                let start = range.start + found.start;
                let end = range.start + found.end;
                (index, range.clone(), start..end)
            })
        });

        match placed {
            Some((index, outer, matched)) => {
                let replacement = [
                    Segment::Text(outer.start..matched.start),
                    Segment::Anchor {
                        node_id: claim.node_id.clone(),
                        range: matched.clone(),
                    },
                    Segment::Text(matched.end..outer.end),
                ];
                segments.splice(
                    index..=index,
                    replacement
                        .into_iter()
                        .filter(|segment| !segment.range().is_empty()),
                );
            }
            None => {
                tracing::debug!(
                    node_id = %claim.node_id,
                    highlighted_text = claim.highlighted_text,
                    "branch highlight has no match in parent text"
                );
                unmatched.push(claim.node_id.clone());
            }
        }
    }

    AnchorMatch {
        segments,
        unmatched,
    }
}

/// Anchor the direct branch children of `parent_id` in `text`.
///
/// `text` is normally [`crate::markup::rendered_text`] of the parent content.
/// Unknown parents produce a single plain segment.
#[must_use]
pub fn branch_anchors(state: &ConversationState, parent_id: &NodeId, text: &str) -> AnchorMatch {
    let claims: Vec<BranchClaim<'_>> = state
        .branch_children(parent_id)
        .filter_map(|child| {
            child
                .highlighted_text
                .as_deref()
                .map(|highlighted_text| BranchClaim {
                    node_id: &child.id,
                    highlighted_text,
                })
        })
        .collect();
    match_anchors(text, &claims)
}

/// Byte range of the first case-insensitive occurrence of `needle` in `haystack`.
///
/// Comparison is per character on full lowercase mappings, so the range
/// always falls on `haystack` char boundaries even when case mapping changes
/// byte lengths.
#[must_use]
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }

    haystack.char_indices().find_map(|(start, _)| {
        let mut rest = haystack[start..].chars();
        let mut consumed = 0;
        for expected in needle.chars() {
            let actual = rest.next()?;
            if !actual.to_lowercase().eq(expected.to_lowercase()) {
                return None;
            }
            consumed += actual.len_utf8();
        }
        Some(start..start + consumed)
    })
}

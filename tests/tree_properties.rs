//! Property tests over random prompt sequences.
//!
//! Verifies:
//! 1. Referential integrity: parent and child links always agree
//! 2. Exactly one root once anything was submitted
//! 3. Branch highlights occur in their parent's content
//! 4. Token totals stay consistent
//! 5. Layout is deterministic and covers every node
//! 6. Collapse then expand restores the same laid-out node set

use std::collections::BTreeSet;

use chat_canvas::render::anchors::find_case_insensitive;
use chat_canvas::{compute_layout, ConversationState, LayoutConfig, NodeId};
use proptest::prelude::*;
use proptest::sample::Index;

#[derive(Debug, Clone)]
struct Step {
    as_root: bool,
    parent: Index,
    as_branch: bool,
    answer: bool,
}

fn arb_step() -> impl Strategy<Value = Step> {
    (
        prop::bool::weighted(0.1),
        any::<Index>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(as_root, parent, as_branch, answer)| Step {
            as_root,
            parent,
            as_branch,
            answer,
        })
}

fn build(steps: &[Step]) -> ConversationState {
    let mut state = ConversationState::default();

    for (index, step) in steps.iter().enumerate() {
        let ids: Vec<NodeId> = state.nodes().map(|node| node.id.clone()).collect();
        let parent = if step.as_root || ids.is_empty() {
            None
        } else {
            Some(step.parent.get(&ids).clone())
        };
        let highlight = if step.as_branch {
            parent
                .as_ref()
                .and_then(|id| state.node(id))
                .and_then(|node| node.content.split_whitespace().last())
                .map(str::to_owned)
        } else {
            None
        };

        let before = state.clone();
        match state.submit_prompt(
            parent.as_ref(),
            &format!("question number {index}"),
            highlight.as_deref(),
        ) {
            Ok((next, ids)) => {
                state = next;
                if step.answer {
                    state = state
                        .with_appended_content(&ids.assistant, &format!("Answer {index} here"))
                        .expect("assistant exists");
                }
            }
            Err(_) => assert_eq!(state, before, "rejected submission changed the state"),
        }
    }

    state
}

fn assert_integrity(state: &ConversationState) {
    let roots: Vec<&NodeId> = state
        .nodes()
        .filter(|node| node.is_root())
        .map(|node| &node.id)
        .collect();
    if state.is_empty() {
        assert!(roots.is_empty());
        assert!(state.root_id().is_none());
    } else {
        assert_eq!(roots, vec![state.root_id().expect("root id")]);
    }

    for node in state.nodes() {
        if let Some(parent_id) = &node.parent_id {
            let parent = state.node(parent_id).expect("parent present");
            assert!(parent.children_ids.contains(&node.id));
        }

        let listed: BTreeSet<&NodeId> = node.children_ids.iter().collect();
        assert_eq!(listed.len(), node.children_ids.len(), "duplicate child ids");
        let claimed: BTreeSet<&NodeId> = state
            .nodes()
            .filter(|child| child.parent_id.as_ref() == Some(&node.id))
            .map(|child| &child.id)
            .collect();
        assert_eq!(listed, claimed);

        assert_eq!(node.is_branch, node.highlighted_text.is_some());
        if let Some(highlight) = &node.highlighted_text {
            let parent = node
                .parent_id
                .as_ref()
                .and_then(|id| state.node(id))
                .expect("branch parent");
            assert!(find_case_insensitive(&parent.content, highlight).is_some());
        }
    }

    let tokens = state.tokens();
    assert_eq!(tokens.total(), tokens.input() + tokens.output());
}

proptest! {
    #[test]
    fn random_sequences_keep_the_tree_consistent(
        steps in prop::collection::vec(arb_step(), 1..40)
    ) {
        let state = build(&steps);
        assert_integrity(&state);
        prop_assert!(!state.is_empty());
    }

    #[test]
    fn layout_is_deterministic_and_complete(
        steps in prop::collection::vec(arb_step(), 1..30)
    ) {
        let state = build(&steps);
        let config = LayoutConfig::default();

        let first = compute_layout(&state, &config);
        let second = compute_layout(&state, &config);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), state.len());
        prop_assert_eq!(first.connectors().len(), state.len() - 1);
    }

    #[test]
    fn collapse_and_expand_restore_the_node_set(
        steps in prop::collection::vec(arb_step(), 1..30),
        pick in any::<Index>(),
    ) {
        let state = build(&steps);
        let config = LayoutConfig::default();
        let ids: Vec<NodeId> = state.nodes().map(|node| node.id.clone()).collect();
        let target = pick.get(&ids).clone();

        let expanded = compute_layout(&state, &config);
        let collapsed_state = state.with_collapse_toggled(&target).expect("toggle");
        let collapsed = compute_layout(&collapsed_state, &config);

        let hidden: BTreeSet<NodeId> = state.descendants(&target).into_iter().collect();
        let visible: BTreeSet<NodeId> = collapsed.positions().keys().cloned().collect();
        let all: BTreeSet<NodeId> = expanded.positions().keys().cloned().collect();
        prop_assert!(visible.contains(&target));
        prop_assert!(visible.is_disjoint(&hidden));
        prop_assert_eq!(visible.len() + hidden.len(), all.len());

        let restored_state = collapsed_state.with_collapse_toggled(&target).expect("toggle back");
        let restored = compute_layout(&restored_state, &config);
        prop_assert_eq!(restored.positions(), expanded.positions());
    }
}

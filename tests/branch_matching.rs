use chat_canvas::{
    branch_anchors, match_anchors, BranchClaim, ConversationState, NodeId, PromptPairIds, Segment,
};
use pretty_assertions::assert_eq;

const SKY: &str = "The sky is blue and the grass is green";

fn parent_with_branches(highlights: &[&str]) -> (ConversationState, NodeId) {
    let root = PromptPairIds::new("u1", "a1");
    let mut state = ConversationState::default()
        .with_prompt_pair(None, "Describe the view", None, &root)
        .and_then(|state| state.with_appended_content(&root.assistant, SKY))
        .expect("root exchange");

    for (index, highlight) in highlights.iter().enumerate() {
        let ids = PromptPairIds::new(format!("b{index}"), format!("b{index}-reply"));
        state = state
            .with_prompt_pair(Some(&root.assistant), "Why?", Some(highlight), &ids)
            .expect("branch");
    }
    (state, root.assistant)
}

#[test]
fn both_highlights_anchor_without_overlap() {
    let (state, parent) = parent_with_branches(&["blue", "sky"]);

    let result = branch_anchors(&state, &parent, SKY);

    assert!(result.unmatched.is_empty());
    let anchors: Vec<(&str, &str)> = result
        .anchors()
        .map(|(id, range)| (id.as_str(), &SKY[range.clone()]))
        .collect();
    assert_eq!(anchors, vec![("b1", "sky"), ("b0", "blue")]);

    let blue = result.anchor_for(&NodeId::from("b0")).expect("blue");
    let sky = result.anchor_for(&NodeId::from("b1")).expect("sky");
    assert!(sky.end <= blue.start || blue.end <= sky.start);
}

#[test]
fn segments_reassemble_the_original_text() {
    let (state, parent) = parent_with_branches(&["blue", "sky", "GREEN"]);

    let result = branch_anchors(&state, &parent, SKY);
    let rebuilt: String = result.segments.iter().map(|segment| segment.text(SKY)).collect();

    assert_eq!(rebuilt, SKY);
    assert!(result
        .segments
        .windows(2)
        .all(|pair| pair[0].range().end == pair[1].range().start));
    assert!(matches!(
        result.segments.last(),
        Some(Segment::Anchor { node_id, .. }) if node_id.as_str() == "b2"
    ));
}

#[test]
fn longer_highlight_wins_the_shared_span() {
    let long = NodeId::from("long");
    let short = NodeId::from("short");
    let text = "the grass is green, green as grass";

    let result = match_anchors(
        text,
        &[
            BranchClaim {
                node_id: &short,
                highlighted_text: "grass",
            },
            BranchClaim {
                node_id: &long,
                highlighted_text: "the grass is green",
            },
        ],
    );

    assert_eq!(result.anchor_for(&long), Some(&(0..18)));
    assert_eq!(result.anchor_for(&short), Some(&(29..34)));
}

#[test]
fn drifted_parent_text_is_a_silent_miss() {
    let (state, parent) = parent_with_branches(&["blue"]);

    let result = branch_anchors(&state, &parent, "The content was regenerated.");

    assert_eq!(result.anchors().count(), 0);
    assert_eq!(result.unmatched, vec![NodeId::from("b0")]);
}

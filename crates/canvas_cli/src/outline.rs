//! Plain-text views of the canvas for the line-oriented driver.

use chat_canvas::{
    rendered_text, split_thinking, ConnectorKind, ConversationState, Layout, MessageNode,
    RenderedAnchors, Segment, TokenStats,
};

const PREVIEW_CHARS: usize = 60;

/// One line per laid-out node, depth first in display order.
///
/// Branches are prefixed with `↳` and their excerpt; collapsed nodes show
/// how many descendants are hidden. With `show_connectors` the layout
/// edges are listed afterwards.
pub fn render_tree(state: &ConversationState, layout: &Layout, show_connectors: bool) -> Vec<String> {
    let Some(root) = state.root() else {
        return vec!["(empty canvas; type a prompt or /demo)".to_string()];
    };

    let mut lines = Vec::with_capacity(layout.len());
    let mut stack: Vec<(&MessageNode, usize)> = vec![(root, 0)];
    while let Some((node, depth)) = stack.pop() {
        let Some(position) = layout.position(&node.id) else {
            continue;
        };

        let mut line = format!(
            "{indent}{marker}{id} [{role}] @ ({x:.0}, {y:.0})",
            indent = "  ".repeat(depth),
            marker = if node.is_branch { "↳ " } else { "" },
            id = node.id,
            role = node.role.as_str(),
            x = position.x,
            y = position.y,
        );
        if let Some(highlight) = &node.highlighted_text {
            line.push_str(&format!(" «{highlight}»"));
        }
        if node.is_collapsed {
            line.push_str(&format!(" (+{} hidden)", state.descendants(&node.id).len()));
        }
        let preview = preview(&node.content);
        if !preview.is_empty() {
            line.push_str(&format!(" {preview}"));
        }
        lines.push(line);

        if !node.is_collapsed {
            let children: Vec<&MessageNode> = state.children(&node.id).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }

    if show_connectors {
        lines.push("connectors:".to_string());
        lines.extend(layout.connectors().iter().map(|edge| {
            let kind = match edge.kind {
                ConnectorKind::Vertical => "vertical",
                ConnectorKind::Branch => "branch",
            };
            format!("  {} -> {} ({kind})", edge.from, edge.to)
        }));
    }

    lines
}

pub fn render_tokens(tokens: TokenStats) -> String {
    format!(
        "tokens: input {} · output {} · total {}",
        tokens.input(),
        tokens.output(),
        tokens.total()
    )
}

/// The parent's rendered text with each anchored span bracketed by branch id.
pub fn render_anchors(anchors: &RenderedAnchors) -> Vec<String> {
    let mut marked = String::with_capacity(anchors.text.len());
    for segment in &anchors.matches.segments {
        match segment {
            Segment::Text(range) => marked.push_str(&anchors.text[range.clone()]),
            Segment::Anchor { node_id, range } => {
                marked.push_str(&format!("[{}]{{{node_id}}}", &anchors.text[range.clone()]));
            }
        }
    }

    let mut lines = vec![marked];
    lines.extend(
        anchors
            .matches
            .unmatched
            .iter()
            .map(|id| format!("(no anchor for {id})")),
    );
    lines
}

/// The visible answer of a reply, without any reasoning section.
pub fn reply_text(content: &str) -> String {
    rendered_text(split_thinking(content).answer)
}

fn preview(content: &str) -> String {
    let split = split_thinking(content);
    let text = if split.answer.is_empty() && !split.thinking_complete {
        "(thinking…)".to_string()
    } else {
        rendered_text(split.answer)
    };

    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= PREVIEW_CHARS {
        return flattened;
    }
    let cut: String = flattened.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use chat_canvas::{compute_layout, sample_conversation, LayoutConfig, NodeId};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tree_lists_nodes_in_display_order() {
        let state = sample_conversation().expect("sample");
        let layout = compute_layout(&state, &LayoutConfig::default());

        let lines = render_tree(&state, &layout, false);

        assert_eq!(lines.len(), 14);
        assert!(lines[0].starts_with("mock-user-1 [user] @ (0, 0)"));
        assert!(lines[1].starts_with("  mock-asst-1 [assistant] @ (0, 240)"));
        assert!(lines
            .iter()
            .any(|line| line.contains("↳ mock-user-branch-1 [user] @ (650, 240) «React.memo»")));
    }

    #[test]
    fn collapsed_nodes_report_hidden_descendants() {
        let state = sample_conversation()
            .expect("sample")
            .with_collapse_toggled(&NodeId::from("mock-asst-2"))
            .expect("collapse");
        let layout = compute_layout(&state, &LayoutConfig::default());

        let lines = render_tree(&state, &layout, true);

        assert!(lines
            .iter()
            .any(|line| line.contains("mock-asst-2 [assistant] @ (0, 720) (+4 hidden)")));
        assert!(lines.contains(&"connectors:".to_string()));
        assert!(lines.contains(&"  mock-asst-1 -> mock-user-branch-1 (branch)".to_string()));
    }

    #[test]
    fn previews_hide_reasoning() {
        assert_eq!(preview("<think>plan</think>**Done.**"), "Done.");
        assert_eq!(preview("<think>still planning"), "(thinking…)");
        assert_eq!(reply_text("<think>x</think>\n\n# Title\n\nBody"), "Title\nBody");
    }

    #[test]
    fn token_line_shows_all_counters() {
        assert_eq!(
            render_tokens(TokenStats::new(1, 4)),
            "tokens: input 1 · output 4 · total 5"
        );
    }
}

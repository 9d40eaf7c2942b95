use markdown::mdast;
use markdown::{to_mdast, Constructs, ParseOptions};

use super::thinking::split_thinking;

fn parse_options() -> ParseOptions {
    ParseOptions {
        constructs: Constructs {
            math_flow: true,
            math_text: true,
            ..Constructs::gfm()
        },
        ..ParseOptions::gfm()
    }
}

/// Plain text a reader sees when `content` is rendered as markdown.
///
/// Markup is dropped, code and math keep their source text, and block-level
/// elements are separated by newlines. Content that fails to parse is
/// returned unchanged.
#[must_use]
pub fn rendered_text(content: &str) -> String {
    let root = match to_mdast(content, &parse_options()) {
        Ok(node) => node,
        Err(_) => return content.to_string(),
    };

    let mut out = String::new();
    collect_text(&root, &mut out);
    out.trim_end_matches('\n').to_string()
}

/// Rendered text of the answer part of `content`, leaving out any
/// `<think>` section. Branch anchors are matched against this.
#[must_use]
pub fn visible_text(content: &str) -> String {
    rendered_text(split_thinking(content).answer)
}

fn collect_text(node: &mdast::Node, out: &mut String) {
    match node {
        mdast::Node::Text(text) => out.push_str(&text.value),
        mdast::Node::InlineCode(code) => out.push_str(&code.value),
        mdast::Node::InlineMath(math) => out.push_str(&math.value),
        mdast::Node::Html(html) => out.push_str(&html.value),
        mdast::Node::Image(image) => out.push_str(&image.alt),
        mdast::Node::Break(_) => out.push('\n'),
        mdast::Node::Code(code) => push_block(out, &code.value),
        mdast::Node::Math(math) => push_block(out, &math.value),
        mdast::Node::ThematicBreak(_) => start_block(out),
        mdast::Node::TableCell(cell) => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\t');
            }
            collect_children(&cell.children, out);
        }
        other => {
            let block = is_block(other);
            if block {
                start_block(out);
            }
            if let Some(children) = other.children() {
                collect_children(children, out);
            }
            if block {
                start_block(out);
            }
        }
    }
}

fn collect_children(children: &[mdast::Node], out: &mut String) {
    for child in children {
        collect_text(child, out);
    }
}

fn is_block(node: &mdast::Node) -> bool {
    matches!(
        node,
        mdast::Node::Heading(_)
            | mdast::Node::Paragraph(_)
            | mdast::Node::Blockquote(_)
            | mdast::Node::List(_)
            | mdast::Node::ListItem(_)
            | mdast::Node::Table(_)
            | mdast::Node::TableRow(_)
    )
}

fn start_block(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_block(out: &mut String, value: &str) {
    start_block(out);
    out.push_str(value);
    start_block(out);
}

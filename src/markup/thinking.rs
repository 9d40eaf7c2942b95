const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Message content separated into its reasoning preamble and its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkingSplit<'a> {
    /// Text inside the `<think>` section, if the content has one.
    pub thinking: Option<&'a str>,
    /// Everything the reader should see as the reply.
    pub answer: &'a str,
    /// False while a `<think>` section is open and still streaming.
    pub thinking_complete: bool,
}

/// Split a `<think>…</think>` section from the rest of `content`.
///
/// While the closing tag has not arrived yet, the whole remainder is
/// reasoning and the answer is empty.
#[must_use]
pub fn split_thinking(content: &str) -> ThinkingSplit<'_> {
    let Some(open) = content.find(OPEN_TAG) else {
        return ThinkingSplit {
            thinking: None,
            answer: content.trim(),
            thinking_complete: true,
        };
    };

    let after_open = &content[open + OPEN_TAG.len()..];
    match after_open.find(CLOSE_TAG) {
        Some(close) => ThinkingSplit {
            thinking: Some(after_open[..close].trim()),
            answer: after_open[close + CLOSE_TAG.len()..].trim(),
            thinking_complete: true,
        },
        None => ThinkingSplit {
            thinking: Some(after_open.trim()),
            answer: "",
            thinking_complete: false,
        },
    }
}

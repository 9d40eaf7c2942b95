//! A small fixed conversation for demos and layout checks.

use super::error::ConversationError;
use super::node::NodeId;
use super::state::{ConversationState, PromptPairIds};

struct Exchange {
    parent: Option<&'static str>,
    user: &'static str,
    assistant: &'static str,
    highlight: Option<&'static str>,
    prompt: &'static str,
    reply: &'static str,
}

const EXCHANGES: &[Exchange] = &[
    Exchange {
        parent: None,
        user: "mock-user-1",
        assistant: "mock-asst-1",
        highlight: None,
        prompt: "How do I stop a React list from re-rendering on every keystroke?",
        reply: "Start by measuring with the profiler. Then wrap pure rows in React.memo so they \
                skip renders when props are equal, and move rarely changing values such as the \
                theme into the Context API instead of threading them through props.",
    },
    Exchange {
        parent: Some("mock-asst-1"),
        user: "mock-user-2",
        assistant: "mock-asst-2",
        highlight: None,
        prompt: "The rows still re-render. What am I missing?",
        reply: "Inline callbacks create new props on every render. Stabilize them with \
                useCallback and derive expensive values with useMemo; that memoization only \
                pays off when the inputs really stay the same.",
    },
    Exchange {
        parent: Some("mock-asst-2"),
        user: "mock-user-3",
        assistant: "mock-asst-3",
        highlight: None,
        prompt: "Is virtualization worth it for 5,000 rows?",
        reply: "Yes. Rendering only the visible window keeps the DOM small, so scrolling stays \
                smooth regardless of list length.",
    },
    Exchange {
        parent: Some("mock-asst-1"),
        user: "mock-user-branch-1",
        assistant: "mock-asst-branch-1",
        highlight: Some("React.memo"),
        prompt: "How does React.memo compare props?",
        reply: "It does a shallow comparison of each prop. Pass a custom `areEqual` function as \
                the second argument when shallow equality is not enough.",
    },
    Exchange {
        parent: Some("mock-asst-branch-1"),
        user: "mock-user-branch-1-reply",
        assistant: "mock-asst-branch-1-reply",
        highlight: None,
        prompt: "Can a custom comparison hurt performance?",
        reply: "It can. A deep comparison on every render may cost more than the render it \
                avoids.",
    },
    Exchange {
        parent: Some("mock-asst-1"),
        user: "mock-user-branch-2",
        assistant: "mock-asst-branch-2",
        highlight: Some("Context API"),
        prompt: "Does the Context API cause extra renders?",
        reply: "Every consumer re-renders when the provided value changes. Split contexts by \
                update frequency and memoize the value object.",
    },
    Exchange {
        parent: Some("mock-asst-2"),
        user: "mock-user-branch-3",
        assistant: "mock-asst-branch-3",
        highlight: Some("memoization"),
        prompt: "When is memoization a waste?",
        reply: "When the computation is cheap or the inputs change on every render, the cache \
                check is pure overhead.",
    },
];

/// Build the demo tree: a three-exchange main pillar, two branches off the
/// first reply (one with its own follow-up) and one branch off the second.
///
/// Ids are fixed (`mock-user-1`, `mock-asst-branch-2`, ...) and replies are
/// counted as streamed output, so token totals are populated too.
pub fn sample_conversation() -> Result<ConversationState, ConversationError> {
    EXCHANGES
        .iter()
        .try_fold(ConversationState::default(), |state, exchange| {
            let ids = PromptPairIds::new(exchange.user, exchange.assistant);
            let parent = exchange.parent.map(NodeId::from);
            state
                .with_prompt_pair(parent.as_ref(), exchange.prompt, exchange.highlight, &ids)?
                .with_appended_content(&ids.assistant, exchange.reply)
        })
}

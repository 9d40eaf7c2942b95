/// Estimated token count of `text`: one token per four characters, rounded up.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

/// Running token totals for a session.
///
/// Both counters only grow, so `total()` is never observed decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenStats {
    input: u64,
    output: u64,
}

impl TokenStats {
    #[must_use]
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    #[must_use]
    pub fn input(&self) -> u64 {
        self.input
    }

    #[must_use]
    pub fn output(&self) -> u64 {
        self.output
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.input.saturating_add(self.output)
    }

    /// Records a submitted prompt and its optional highlighted context.
    #[must_use]
    pub(crate) fn with_prompt(self, highlighted_text: Option<&str>, prompt: &str) -> Self {
        let estimate = match highlighted_text {
            Some(context) => estimate_tokens(&format!("{context}{prompt}")),
            None => estimate_tokens(prompt),
        };
        Self {
            input: self.input.saturating_add(estimate),
            ..self
        }
    }

    /// Records one streamed fragment.
    #[must_use]
    pub(crate) fn with_fragment(self, fragment: &str) -> Self {
        Self {
            output: self.output.saturating_add(estimate_tokens(fragment)),
            ..self
        }
    }
}

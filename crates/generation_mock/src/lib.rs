//! Deterministic mock implementation of the shared `generation` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use generation::{
    CancelSignal, GenerationEvent, GenerationRequest, GenerationTransport, StreamId,
    TransportProfile,
};

/// Stable transport identifier used for explicit startup selection.
pub const MOCK_TRANSPORT_ID: &str = "mock";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Script {
    /// Fixed fragments, independent of the request.
    Fixed(Vec<String>),
    /// Rich markdown reply synthesized from the request.
    Canned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentMode {
    /// Re-split fragments at whitespace boundaries, keeping delimiters.
    WordSplit,
    /// Emit each fragment exactly as given.
    Verbatim,
}

/// Deterministic mock transport used by tests and local runs.
#[derive(Debug)]
pub struct MockTransport {
    script: Script,
    mode: FragmentMode,
    failure: Option<String>,
    start_delay: Duration,
    fragment_delay: Duration,
    model_ids: Vec<String>,
    selection: Mutex<usize>,
}

impl MockTransport {
    const START_DELAY_MS: u64 = 200;
    const FRAGMENT_DELAY_MS: u64 = 20;

    /// Creates a mock transport that streams `chunks` word by word.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self::with_script(Script::Fixed(chunks), FragmentMode::WordSplit)
    }

    /// Creates a mock transport that emits exactly `fragments`, in order, with no delays.
    #[must_use]
    pub fn scripted<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        Self::with_script(Script::Fixed(fragments), FragmentMode::Verbatim)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    /// Creates a scripted transport that fails after emitting `fragments`.
    #[must_use]
    pub fn failing<I, S>(fragments: I, error: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut transport = Self::scripted(fragments);
        transport.failure = Some(error.into());
        transport
    }

    /// Creates a transport that answers every request with a synthesized markdown reply.
    #[must_use]
    pub fn canned() -> Self {
        Self::with_script(Script::Canned, FragmentMode::WordSplit)
    }

    /// Overrides the delay before the first fragment and between fragments.
    #[must_use]
    pub fn with_delays(mut self, start_delay: Duration, fragment_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self.fragment_delay = fragment_delay;
        self
    }

    /// Overrides the model ids reported and cycled through.
    #[must_use]
    pub fn with_model_ids(mut self, model_ids: Vec<String>) -> Self {
        self.model_ids = sanitize_model_ids(model_ids);
        *lock_unpoisoned(&self.selection) = 0;
        self
    }

    fn with_script(script: Script, mode: FragmentMode) -> Self {
        Self {
            script,
            mode,
            failure: None,
            start_delay: Duration::from_millis(Self::START_DELAY_MS),
            fragment_delay: Duration::from_millis(Self::FRAGMENT_DELAY_MS),
            model_ids: sanitize_model_ids(vec!["mock".to_string(), "mock-alt".to_string()]),
            selection: Mutex::new(0),
        }
    }

    fn profile_for_selection(&self, selection: usize) -> TransportProfile {
        TransportProfile {
            transport_id: MOCK_TRANSPORT_ID.to_string(),
            model_id: self.model_ids[selection].clone(),
        }
    }

    fn fragments_for(&self, req: &GenerationRequest) -> Vec<String> {
        let chunks = match &self.script {
            Script::Fixed(chunks) => chunks.clone(),
            Script::Canned => vec![canned_response(
                req.last_user_prompt().unwrap_or_default(),
                req.highlighted_context.as_deref(),
            )],
        };

        match self.mode {
            FragmentMode::Verbatim => chunks,
            FragmentMode::WordSplit => chunks.iter().flat_map(|chunk| split_words(chunk)).collect(),
        }
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::canned()
    }
}

impl GenerationTransport for MockTransport {
    fn profile(&self) -> TransportProfile {
        let selection = lock_unpoisoned(&self.selection);
        self.profile_for_selection(*selection)
    }

    fn cycle_model(&self) -> Result<TransportProfile, String> {
        let mut selection = lock_unpoisoned(&self.selection);
        *selection = (*selection + 1) % self.model_ids.len();
        Ok(self.profile_for_selection(*selection))
    }

    fn generate(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;
        let fragments = self.fragments_for(&req);

        emit(GenerationEvent::Started { stream_id });
        self.pause(self.start_delay);

        for text in fragments {
            if cancel.load(Ordering::SeqCst) {
                emit(GenerationEvent::Cancelled { stream_id });
                return Ok(());
            }

            if text.is_empty() {
                continue;
            }

            emit(GenerationEvent::Fragment { stream_id, text });
            self.pause(self.fragment_delay);
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        finish(stream_id, &cancel, emit);
        Ok(())
    }
}

fn finish(stream_id: StreamId, cancel: &CancelSignal, emit: &mut dyn FnMut(GenerationEvent)) {
    if cancel.load(Ordering::SeqCst) {
        emit(GenerationEvent::Cancelled { stream_id });
    } else {
        emit(GenerationEvent::Finished { stream_id });
    }
}

/// Splits `chunk` into word-sized fragments, each ending at a space or newline.
#[must_use]
pub fn split_words(chunk: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut pending = String::new();

    for ch in chunk.chars() {
        pending.push(ch);
        if matches!(ch, ' ' | '\n') {
            fragments.push(std::mem::take(&mut pending));
        }
    }

    if !pending.is_empty() {
        fragments.push(pending);
    }

    fragments
}

/// Synthesizes a markdown reply with a leading thinking section.
#[must_use]
pub fn canned_response(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!(
            "<think>\n\
             Follow-up on \"{prompt}\" anchored to \"{context}\".\n\
             Narrowing the answer to the highlighted excerpt...\n\
             </think>\n\n\
             ### Follow-up on: *\"{context}\"*\n\n\
             A closer look at **{prompt}**:\n\n\
             ```rust\n\
             fn attraction(m1: f64, m2: f64, r: f64) -> f64 {{\n\
             \x20   const G: f64 = 6.674_30e-11;\n\
             \x20   G * m1 * m2 / (r * r)\n\
             }}\n\
             ```\n\n\
             $$F = G \\frac{{m_1 m_2}}{{r^2}}$$\n\n\
             This ties the branch back to its highlighted context."
        ),
        None => format!(
            "<think>\n\
             Preparing a reply for \"{prompt}\".\n\
             Laying out markdown, math, and a code sample...\n\
             </think>\n\n\
             ### A rich reply to: **\"{prompt}\"**\n\n\
             Math renders inline and in blocks, such as the quadratic formula:\n\
             $$x = \\frac{{-b \\pm \\sqrt{{b^2 - 4ac}}}}{{2a}}$$\n\n\
             Code blocks stream too:\n\
             ```rust\n\
             let features = [\"markdown\", \"latex\", \"thinking\"];\n\
             ```\n\n\
             Highlight any text to start a branch!"
        ),
    }
}

fn sanitize_model_ids(model_ids: Vec<String>) -> Vec<String> {
    let mut sanitized: Vec<String> = model_ids
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if sanitized.is_empty() {
        sanitized.push("mock".to_string());
    }

    sanitized
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

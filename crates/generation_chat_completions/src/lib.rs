//! Chat-completions-backed implementation of the shared `generation` contract.
//!
//! This adapter translates `chat_completions_api` stream events into the
//! ordered `GenerationEvent` lifecycle the conversation runtime consumes.
//! Fragments are forwarded as soon as each SSE line parses.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chat_completions_api::{
    ChatCompletionRequest, ChatCompletionsClient, ChatCompletionsConfig, ChatCompletionsError,
    ChatMessage, ChatStreamEvent, FinishReason,
};
use generation::{
    CancelSignal, GenerationEvent, GenerationRequest, GenerationTransport, TransportInitError,
    TransportProfile,
};

/// Stable transport identifier used by startup selection.
pub const CHAT_COMPLETIONS_TRANSPORT_ID: &str = "chat-completions";

/// Model used when the configured list is empty.
pub const DEFAULT_MODEL_ID: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectionState {
    model_index: usize,
}

/// Runtime configuration for the chat-completions transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionsTransportConfig {
    pub api_key: String,
    pub model_ids: Vec<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl ChatCompletionsTransportConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model_ids: Vec<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_ids,
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<(), TransportInitError> {
        if self.api_key.trim().is_empty() {
            return Err(TransportInitError::new(
                "chat-completions transport requires a non-empty API key",
            ));
        }

        if let Some(base_url) = self.base_url.as_deref() {
            let parsed = url::Url::parse(base_url.trim()).map_err(|error| {
                TransportInitError::new(format!("invalid API URL '{base_url}': {error}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(TransportInitError::new(format!(
                    "unsupported API URL scheme '{}'",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }

    fn into_client_config(self) -> ChatCompletionsConfig {
        let mut config = ChatCompletionsConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url.trim());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait StreamClient: Send + Sync {
    fn stream(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(ChatStreamEvent),
    ) -> Result<Option<FinishReason>, ChatCompletionsError>;
}

#[derive(Debug)]
struct DefaultStreamClient {
    client: ChatCompletionsClient,
}

impl StreamClient for DefaultStreamClient {
    fn stream(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
        on_event: &mut dyn FnMut(ChatStreamEvent),
    ) -> Result<Option<FinishReason>, ChatCompletionsError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                ChatCompletionsError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(
            self.client
                .stream_with_handler(request, Some(cancel), |event| on_event(event)),
        )
    }
}

/// `GenerationTransport` backed by a streaming chat-completions endpoint.
pub struct ChatCompletionsTransport {
    model_ids: Vec<String>,
    selection: Mutex<SelectionState>,
    stream_client: Arc<dyn StreamClient>,
}

impl ChatCompletionsTransport {
    /// Creates a transport using a real HTTP client.
    pub fn new(config: ChatCompletionsTransportConfig) -> Result<Self, TransportInitError> {
        config.validate()?;
        let model_ids = sanitize_model_ids(config.model_ids.clone());
        let stream_client = Arc::new(DefaultStreamClient {
            client: ChatCompletionsClient::new(config.into_client_config())
                .map_err(map_init_error)?,
        });

        Ok(Self {
            model_ids,
            selection: Mutex::new(SelectionState { model_index: 0 }),
            stream_client,
        })
    }

    fn selected_model(&self) -> String {
        let selection = lock_unpoisoned(&self.selection);
        self.model_ids[selection.model_index].clone()
    }

    fn build_request(&self, req: &GenerationRequest) -> ChatCompletionRequest {
        let messages = req
            .messages()
            .into_iter()
            .map(|message| ChatMessage::new(message.role.as_str(), message.content))
            .collect();
        ChatCompletionRequest::new(self.selected_model(), messages)
    }

    #[cfg(test)]
    fn with_stream_client_for_tests(
        model_ids: Vec<String>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        Self {
            model_ids: sanitize_model_ids(model_ids),
            selection: Mutex::new(SelectionState { model_index: 0 }),
            stream_client,
        }
    }
}

impl GenerationTransport for ChatCompletionsTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: CHAT_COMPLETIONS_TRANSPORT_ID.to_string(),
            model_id: self.selected_model(),
        }
    }

    fn cycle_model(&self) -> Result<TransportProfile, String> {
        let mut selection = lock_unpoisoned(&self.selection);
        selection.model_index = (selection.model_index + 1) % self.model_ids.len();
        drop(selection);

        Ok(self.profile())
    }

    fn generate(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String> {
        let stream_id = req.stream_id;

        emit(GenerationEvent::Started { stream_id });

        if cancel.load(Ordering::Acquire) {
            emit(GenerationEvent::Cancelled { stream_id });
            return Ok(());
        }

        let request = self.build_request(&req);
        let outcome = self.stream_client.stream(&request, &cancel, &mut |event| {
            if let ChatStreamEvent::ContentDelta { delta } = event {
                if !delta.is_empty() {
                    emit(GenerationEvent::Fragment {
                        stream_id,
                        text: delta,
                    });
                }
            }
        });

        match outcome {
            Ok(_) => emit(GenerationEvent::Finished { stream_id }),
            Err(ChatCompletionsError::Cancelled) => emit(GenerationEvent::Cancelled { stream_id }),
            Err(error) => emit(GenerationEvent::Failed {
                stream_id,
                error: describe_failure(&error),
            }),
        }

        Ok(())
    }
}

fn describe_failure(error: &ChatCompletionsError) -> String {
    match error {
        ChatCompletionsError::Status(status, message) => {
            format!("API request failed with status {}: {message}", status.as_u16())
        }
        other => other.to_string(),
    }
}

fn sanitize_model_ids(model_ids: Vec<String>) -> Vec<String> {
    let mut sanitized: Vec<String> = model_ids
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();

    if sanitized.is_empty() {
        sanitized.push(DEFAULT_MODEL_ID.to_string());
    }

    sanitized
}

fn map_init_error(error: ChatCompletionsError) -> TransportInitError {
    TransportInitError::new(format!(
        "Failed to initialize chat-completions transport: {error}"
    ))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use chat_completions_api::StatusCode;
    use generation::HistoryMessage;

    use super::*;

    enum FakeStreamOutcome {
        Success(Vec<ChatStreamEvent>, Option<FinishReason>),
        Error(Vec<ChatStreamEvent>, ChatCompletionsError),
    }

    struct FakeStreamClient {
        observed_request: Mutex<Option<ChatCompletionRequest>>,
        outcome: Mutex<Option<FakeStreamOutcome>>,
    }

    impl FakeStreamClient {
        fn success(events: Vec<ChatStreamEvent>) -> Arc<Self> {
            Arc::new(Self {
                observed_request: Mutex::new(None),
                outcome: Mutex::new(Some(FakeStreamOutcome::Success(
                    events,
                    Some(FinishReason::Stop),
                ))),
            })
        }

        fn failure(events: Vec<ChatStreamEvent>, error: ChatCompletionsError) -> Arc<Self> {
            Arc::new(Self {
                observed_request: Mutex::new(None),
                outcome: Mutex::new(Some(FakeStreamOutcome::Error(events, error))),
            })
        }

        fn observed_request(&self) -> Option<ChatCompletionRequest> {
            lock_unpoisoned(&self.observed_request).clone()
        }
    }

    impl StreamClient for FakeStreamClient {
        fn stream(
            &self,
            request: &ChatCompletionRequest,
            _cancel: &CancelSignal,
            on_event: &mut dyn FnMut(ChatStreamEvent),
        ) -> Result<Option<FinishReason>, ChatCompletionsError> {
            *lock_unpoisoned(&self.observed_request) = Some(request.clone());

            match lock_unpoisoned(&self.outcome).take() {
                Some(FakeStreamOutcome::Success(events, reason)) => {
                    events.into_iter().for_each(&mut *on_event);
                    Ok(reason)
                }
                Some(FakeStreamOutcome::Error(events, error)) => {
                    events.into_iter().for_each(&mut *on_event);
                    Err(error)
                }
                None => panic!("fake stream outcome should be consumed exactly once"),
            }
        }
    }

    fn delta(text: &str) -> ChatStreamEvent {
        ChatStreamEvent::ContentDelta {
            delta: text.to_string(),
        }
    }

    fn request(context: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            stream_id: 9,
            history: vec![HistoryMessage::user("Explain gravity")],
            highlighted_context: context.map(str::to_string),
        }
    }

    fn generate_events(
        transport: &ChatCompletionsTransport,
        req: GenerationRequest,
        cancelled: bool,
    ) -> Vec<GenerationEvent> {
        let cancel = Arc::new(AtomicBool::new(cancelled));
        let mut events = Vec::new();

        transport
            .generate(req, cancel, &mut |event| events.push(event))
            .expect("generate should not return transport-level failure");

        events
    }

    #[test]
    fn profile_reports_transport_id_and_selected_model() {
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            FakeStreamClient::success(Vec::new()),
        );

        let initial = transport.profile();
        assert_eq!(initial.transport_id, CHAT_COMPLETIONS_TRANSPORT_ID);
        assert_eq!(initial.model_id, "gpt-4o");

        let switched = transport
            .cycle_model()
            .expect("chat-completions transport should support model cycling");
        assert_eq!(switched.model_id, "gpt-4o-mini");
        let wrapped = transport.cycle_model().expect("cycle wraps around");
        assert_eq!(wrapped.model_id, "gpt-4o");
    }

    #[test]
    fn generate_maps_deltas_to_fragments_and_completion_to_finished() {
        let stream = FakeStreamClient::success(vec![
            delta("Gravity pulls "),
            delta(""),
            delta("masses together."),
            ChatStreamEvent::Done,
        ]);
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            vec!["gpt-4o".to_string()],
            Arc::clone(&stream) as Arc<dyn StreamClient>,
        );

        let events = generate_events(&transport, request(None), false);

        assert_eq!(
            events,
            vec![
                GenerationEvent::Started { stream_id: 9 },
                GenerationEvent::Fragment {
                    stream_id: 9,
                    text: "Gravity pulls ".to_string(),
                },
                GenerationEvent::Fragment {
                    stream_id: 9,
                    text: "masses together.".to_string(),
                },
                GenerationEvent::Finished { stream_id: 9 },
            ]
        );

        let observed = stream.observed_request().expect("request observed");
        assert_eq!(observed.model, "gpt-4o");
        assert!(observed.stream);
        assert_eq!(
            observed.messages,
            vec![ChatMessage::new("user", "Explain gravity")]
        );
    }

    #[test]
    fn highlighted_context_is_sent_as_system_message() {
        let stream = FakeStreamClient::success(Vec::new());
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            Vec::new(),
            Arc::clone(&stream) as Arc<dyn StreamClient>,
        );

        generate_events(&transport, request(Some("orbits")), false);

        let observed = stream.observed_request().expect("request observed");
        assert_eq!(observed.messages.len(), 2);
        assert_eq!(observed.messages[0].role, "system");
        assert!(observed.messages[0].content.contains("\"orbits\""));
    }

    #[test]
    fn generate_maps_cancelled_client_to_cancelled_event() {
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            Vec::new(),
            FakeStreamClient::failure(vec![delta("par")], ChatCompletionsError::Cancelled),
        );

        let events = generate_events(&transport, request(None), false);

        assert!(matches!(
            events.first(),
            Some(GenerationEvent::Started { stream_id: 9 })
        ));
        assert!(matches!(
            events.last(),
            Some(GenerationEvent::Cancelled { stream_id: 9 })
        ));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn pre_cancelled_signal_skips_the_request() {
        let stream = FakeStreamClient::success(vec![delta("never")]);
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            Vec::new(),
            Arc::clone(&stream) as Arc<dyn StreamClient>,
        );

        let events = generate_events(&transport, request(None), true);

        assert_eq!(
            events,
            vec![
                GenerationEvent::Started { stream_id: 9 },
                GenerationEvent::Cancelled { stream_id: 9 },
            ]
        );
        assert!(stream.observed_request().is_none());
    }

    #[test]
    fn generate_maps_client_error_to_failed_event_after_partial_fragments() {
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            Vec::new(),
            FakeStreamClient::failure(
                vec![delta("Partial")],
                ChatCompletionsError::StreamFailed {
                    code: None,
                    message: "boom".to_string(),
                },
            ),
        );

        let events = generate_events(&transport, request(None), false);

        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[1],
            GenerationEvent::Fragment { text, .. } if text == "Partial"
        ));
        assert!(matches!(
            events.last(),
            Some(GenerationEvent::Failed { stream_id: 9, error }) if error.contains("boom")
        ));
    }

    #[test]
    fn http_status_failures_mention_the_status_code() {
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            Vec::new(),
            FakeStreamClient::failure(
                Vec::new(),
                ChatCompletionsError::Status(StatusCode::UNAUTHORIZED, "invalid api key".to_string()),
            ),
        );

        let events = generate_events(&transport, request(None), false);

        assert!(matches!(
            events.last(),
            Some(GenerationEvent::Failed { error, .. })
                if error == "API request failed with status 401: invalid api key"
        ));
    }

    #[test]
    fn empty_model_list_defaults_to_default_model() {
        let transport = ChatCompletionsTransport::with_stream_client_for_tests(
            vec!["  ".to_string()],
            FakeStreamClient::success(Vec::new()),
        );

        assert_eq!(transport.profile().model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn construction_rejects_blank_key_and_bad_url() {
        let blank = ChatCompletionsTransport::new(ChatCompletionsTransportConfig::new(
            " ",
            vec!["gpt-4o".to_string()],
        ));
        assert!(blank.is_err());

        let bad_url = ChatCompletionsTransport::new(
            ChatCompletionsTransportConfig::new("sk-test", Vec::new()).with_base_url("not a url"),
        );
        let error = bad_url.err().expect("bad url should be rejected");
        assert!(error.message().contains("invalid API URL"));

        let ftp = ChatCompletionsTransport::new(
            ChatCompletionsTransportConfig::new("sk-test", Vec::new())
                .with_base_url("ftp://example.com"),
        );
        assert!(ftp.is_err());
    }
}

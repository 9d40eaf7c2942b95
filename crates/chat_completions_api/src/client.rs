use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::config::ChatCompletionsConfig;
use crate::error::{parse_error_message, ChatCompletionsError};
use crate::events::{ChatStreamEvent, FinishReason};
use crate::headers::build_headers;
use crate::payload::ChatCompletionRequest;
use crate::retry::is_retryable_http_error;
use crate::sse::SseStreamParser;
use crate::url::normalize_chat_completions_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatCompletionsClient {
    http: Client,
    config: ChatCompletionsConfig,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<ChatStreamEvent>,
    pub finish_reason: Option<FinishReason>,
}

impl StreamResult {
    /// Concatenation of every content delta, in arrival order.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                ChatStreamEvent::ContentDelta { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl ChatCompletionsClient {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, ChatCompletionsError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatCompletionsError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatCompletionsConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.base_url)
    }

    pub fn build_headers(
        &self,
        user_agent: Option<&str>,
    ) -> Result<HeaderMap, ChatCompletionsError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatCompletionsError::InvalidHeader(format!("key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| ChatCompletionsError::InvalidHeader(format!("value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, ChatCompletionsError> {
        if request.model.trim().is_empty() {
            return Err(ChatCompletionsError::MissingModel);
        }

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let mut payload = request.clone();
        payload.stream = true;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Send the request, retrying transient failures with exponential backoff.
    ///
    /// Non-retryable statuses fail immediately with [`ChatCompletionsError::Status`].
    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, ChatCompletionsError> {
        let policy = self.config.retry;
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;
        let mut attempt = 0;

        loop {
            if is_cancelled(cancellation) {
                return Err(ChatCompletionsError::Cancelled);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(ChatCompletionsError::from);

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if !is_retryable_http_error(status.as_u16(), &body) {
                        return Err(ChatCompletionsError::Status(status, message));
                    }
                    if !policy.allows_retry_after(attempt) {
                        return Err(if policy.max_retries == 0 {
                            ChatCompletionsError::Status(status, message)
                        } else {
                            ChatCompletionsError::RetryExhausted {
                                status: last_status,
                                last_error,
                            }
                        });
                    }
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if !policy.allows_retry_after(attempt) {
                        return Err(if policy.max_retries == 0 {
                            error
                        } else {
                            ChatCompletionsError::RetryExhausted {
                                status: last_status,
                                last_error,
                            }
                        });
                    }
                }
            }

            await_or_cancel(tokio::time::sleep(policy.delay_for(attempt)), cancellation).await?;
            attempt += 1;
        }
    }

    /// Stream a completion, invoking `on_event` for each event as soon as it parses.
    ///
    /// An in-stream `error` object aborts the stream with
    /// [`ChatCompletionsError::StreamFailed`]; events already delivered stay delivered.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<FinishReason>, ChatCompletionsError>
    where
        F: FnMut(ChatStreamEvent),
    {
        let response = self.send_with_retry(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut finish_reason = None;

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(ChatCompletionsError::Cancelled);
            }
            let chunk = chunk.map_err(ChatCompletionsError::from)?;
            for event in parser.feed(&chunk) {
                process_stream_event(event, &mut finish_reason, &mut on_event)?;
            }
            if parser.is_done() {
                break;
            }
        }

        for event in parser.finish() {
            process_stream_event(event, &mut finish_reason, &mut on_event)?;
        }

        if is_cancelled(cancellation) {
            return Err(ChatCompletionsError::Cancelled);
        }

        Ok(finish_reason)
    }

    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, ChatCompletionsError> {
        let mut events = Vec::new();
        let finish_reason = self
            .stream_with_handler(request, cancellation, |event| {
                events.push(event);
            })
            .await?;

        Ok(StreamResult {
            events,
            finish_reason,
        })
    }
}

fn process_stream_event<F>(
    event: ChatStreamEvent,
    finish_reason: &mut Option<FinishReason>,
    on_event: &mut F,
) -> Result<(), ChatCompletionsError>
where
    F: FnMut(ChatStreamEvent),
{
    match &event {
        ChatStreamEvent::Error { code, message } => {
            return Err(ChatCompletionsError::StreamFailed {
                code: code.clone(),
                message: message
                    .clone()
                    .or_else(|| code.clone())
                    .unwrap_or_else(|| "stream reported an error".to_owned()),
            });
        }
        ChatStreamEvent::Finished { reason } => *finish_reason = Some(*reason),
        ChatStreamEvent::ContentDelta { .. } | ChatStreamEvent::Done => {}
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatCompletionsError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatCompletionsError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatCompletionsError::Cancelled);
            }
            return Ok(output);
        }
    }
}

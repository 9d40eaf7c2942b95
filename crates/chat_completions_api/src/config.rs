use std::collections::BTreeMap;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::url::DEFAULT_BASE_URL;

/// Transport configuration for chat-completion requests.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// API key sent as a bearer token, or as `api-key` for Azure endpoints.
    pub api_key: String,
    /// Base URL or full endpoint URL.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// `HTTP-Referer` sent to OpenAI-compatible routers.
    pub referer: String,
    /// `X-Title` sent to OpenAI-compatible routers.
    pub title: String,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
    /// Backoff policy for retryable failures.
    pub retry: RetryPolicy,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            referer: "https://chat-canvas.local".to_string(),
            title: "ChatCanvas".to_string(),
            extra_headers: BTreeMap::new(),
            timeout: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl ChatCompletionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}

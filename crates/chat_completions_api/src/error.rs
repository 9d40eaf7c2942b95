use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatCompletionsError {
    #[error("API key is required")]
    MissingApiKey,
    #[error("model is required")]
    MissingModel,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(
        "retry exhausted after max attempts (status: {}, last_error: {})",
        status_label(.status),
        .last_error.as_deref().unwrap_or("none")
    )]
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    #[error("stream failed{}: {message}", code_label(.code))]
    StreamFailed {
        code: Option<String>,
        message: String,
    },
    #[error("request was cancelled")]
    Cancelled,
    #[error("{0}")]
    Unknown(String),
}

fn status_label(status: &Option<StatusCode>) -> String {
    status.map_or_else(|| "n/a".to_owned(), |status| status.as_u16().to_string())
}

fn code_label(code: &Option<String>) -> String {
    match code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => format!(" ({code})"),
        _ => String::new(),
    }
}

/// Body shape shared by OpenAI-compatible and Azure error responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ErrorBody {
    /// `message`, suffixed with the error type (or code) unless the message already names it.
    fn summary(self) -> Option<String> {
        let message = self.message.filter(|message| !message.trim().is_empty())?;
        let label = self
            .kind
            .filter(|kind| !kind.trim().is_empty())
            .or_else(|| match self.code? {
                Value::String(code) if !code.trim().is_empty() => Some(code),
                Value::Number(code) => Some(code.to_string()),
                _ => None,
            });

        Some(match label {
            Some(label) if !message.contains(&label) => format!("{message} ({label})"),
            _ => message,
        })
    }
}

/// Extracts a human-readable message from an error response body.
///
/// Falls back to the raw body, then to the status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(ErrorBody::summary)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                body.to_owned()
            }
        })
}

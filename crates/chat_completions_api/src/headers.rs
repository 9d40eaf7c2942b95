use std::collections::BTreeMap;

use crate::config::ChatCompletionsConfig;
use crate::error::ChatCompletionsError;
use crate::url::is_azure_endpoint;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_AZURE_API_KEY: &str = "api-key";
pub const HEADER_REFERER: &str = "HTTP-Referer";
pub const HEADER_TITLE: &str = "X-Title";
pub const HEADER_USER_AGENT: &str = "User-Agent";

/// Build a deterministic header map for chat-completion requests.
///
/// Azure deployments authenticate with `api-key`; every other endpoint gets a
/// bearer token plus the referer/title pair OpenAI-compatible routers expect.
pub fn build_headers(
    config: &ChatCompletionsConfig,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, ChatCompletionsError> {
    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(ChatCompletionsError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();

    if is_azure_endpoint(&config.base_url) {
        headers.insert(HEADER_AZURE_API_KEY.to_owned(), api_key.to_owned());
    } else {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
        if let Some(referer) = sanitize_nonempty(&config.referer) {
            headers.insert(HEADER_REFERER.to_owned(), referer);
        }
        if let Some(title) = sanitize_nonempty(&config.title) {
            headers.insert(HEADER_TITLE.to_owned(), title);
        }
    }

    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (None, Some(explicit)) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn sanitize_nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// `chat-canvas/<version> (<os>; <arch>)` using the Node-style arch names routers log.
pub fn default_user_agent() -> String {
    format!(
        "chat-canvas/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        normalize_arch(std::env::consts::ARCH)
    )
}

fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Default base URL for chat-completion requests.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// API version appended to Azure endpoints that do not pin one.
pub const AZURE_API_VERSION: &str = "2024-05-01-preview";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Returns true when `input` targets an Azure-hosted deployment.
pub fn is_azure_endpoint(input: &str) -> bool {
    input.contains("azure.com")
}

/// Normalize a base URL to a chat-completions endpoint.
///
/// Normalization rules:
/// 1) empty input falls back to [`DEFAULT_BASE_URL`]
/// 2) append `/chat/completions` unless the URL already contains it
/// 3) Azure endpoints get `api-version` unless one is already present
pub fn normalize_chat_completions_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let mut url = if base.contains(CHAT_COMPLETIONS_PATH) {
        base.to_string()
    } else {
        format!("{}{CHAT_COMPLETIONS_PATH}", base.trim_end_matches('/'))
    };

    if is_azure_endpoint(&url) && !url.contains("api-version=") {
        let separator = if url.contains('?') { '&' } else { '?' };
        url.push(separator);
        url.push_str("api-version=");
        url.push_str(AZURE_API_VERSION);
    }

    url
}

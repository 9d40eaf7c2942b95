use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use generation::{GenerationTransport, TransportInitError};
use generation_chat_completions::{
    ChatCompletionsTransport, ChatCompletionsTransportConfig, CHAT_COMPLETIONS_TRANSPORT_ID,
    DEFAULT_MODEL_ID,
};
use generation_mock::{MockTransport, MOCK_TRANSPORT_ID};
use serde::Deserialize;

pub const TRANSPORT_ENV_VAR: &str = "CHAT_CANVAS_TRANSPORT";
pub const CONFIG_PATH_ENV_VAR: &str = "CHAT_CANVAS_CONFIG_PATH";
pub const API_KEY_ENV_VAR: &str = "CHAT_CANVAS_API_KEY";
pub const API_URL_ENV_VAR: &str = "CHAT_CANVAS_API_URL";
pub const MODEL_ENV_VAR: &str = "CHAT_CANVAS_MODEL";

pub const DEFAULT_TRANSPORT_ID: &str = MOCK_TRANSPORT_ID;

/// JSON shape of `CHAT_CANVAS_CONFIG_PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatCompletionsFileConfig {
    pub api_key: String,
    #[serde(default)]
    pub api_url: Option<String>,
    pub models: Vec<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

impl ChatCompletionsFileConfig {
    pub fn into_transport_config(self) -> Result<ChatCompletionsTransportConfig, TransportInitError> {
        let models: Vec<String> = self
            .models
            .into_iter()
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty())
            .collect();
        if models.is_empty() {
            return Err(TransportInitError::new(
                "config `models` must include at least one non-empty model id",
            ));
        }

        let mut config = ChatCompletionsTransportConfig::new(self.api_key, models);
        if let Some(api_url) = self.api_url.filter(|url| !url.trim().is_empty()) {
            config = config.with_base_url(api_url);
        }
        match self.timeout_sec {
            Some(0) => {
                return Err(TransportInitError::new(
                    "config `timeout_sec` must be greater than zero",
                ))
            }
            Some(seconds) => config = config.with_timeout(Duration::from_secs(seconds)),
            None => {}
        }
        Ok(config)
    }
}

/// Resolve the transport named by `CHAT_CANVAS_TRANSPORT` (default: mock).
pub fn transport_from_env() -> Result<Arc<dyn GenerationTransport>, TransportInitError> {
    let transport_id = env_string_opt(TRANSPORT_ENV_VAR);
    transport_for_id(transport_id.as_deref().unwrap_or(DEFAULT_TRANSPORT_ID))
}

pub fn transport_for_id(
    transport_id: &str,
) -> Result<Arc<dyn GenerationTransport>, TransportInitError> {
    match transport_id {
        MOCK_TRANSPORT_ID => Ok(Arc::new(MockTransport::default())),
        CHAT_COMPLETIONS_TRANSPORT_ID => {
            let config = chat_completions_config_from_env()?;
            Ok(Arc::new(ChatCompletionsTransport::new(config)?))
        }
        unknown => Err(TransportInitError::new(format!(
            "Unsupported transport '{unknown}'. Available transports: {MOCK_TRANSPORT_ID}, {CHAT_COMPLETIONS_TRANSPORT_ID}"
        ))),
    }
}

/// Config file when `CHAT_CANVAS_CONFIG_PATH` is set, otherwise the API variables.
pub fn chat_completions_config_from_env(
) -> Result<ChatCompletionsTransportConfig, TransportInitError> {
    if let Some(path) = env_string_opt(CONFIG_PATH_ENV_VAR) {
        return load_config_file(Path::new(&path));
    }

    let api_key = env_string_opt(API_KEY_ENV_VAR).ok_or_else(|| {
        TransportInitError::new(format!(
            "{CHAT_COMPLETIONS_TRANSPORT_ID} transport requires {CONFIG_PATH_ENV_VAR} or {API_KEY_ENV_VAR}"
        ))
    })?;
    let model = env_string_opt(MODEL_ENV_VAR).unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
    let mut config = ChatCompletionsTransportConfig::new(api_key, vec![model]);
    if let Some(api_url) = env_string_opt(API_URL_ENV_VAR) {
        config = config.with_base_url(api_url);
    }
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<ChatCompletionsTransportConfig, TransportInitError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        TransportInitError::new(format!(
            "failed to read config file {}: {error}",
            path.display()
        ))
    })?;
    let parsed: ChatCompletionsFileConfig = serde_json::from_str(&raw).map_err(|error| {
        TransportInitError::new(format!(
            "invalid config file {}: {error}",
            path.display()
        ))
    })?;
    parsed.into_transport_config()
}

fn env_string_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Environment configuration.

use std::env;
use std::path::PathBuf;

pub const LOG_FILTER_VAR: &str = "CHAT_CANVAS_LOG";
pub const LOG_FILE_VAR: &str = "CHAT_CANVAS_LOG_FILE";
pub const DEBUG_LAYOUT_VAR: &str = "CHAT_CANVAS_DEBUG_LAYOUT";

/// Filter used when `CHAT_CANVAS_LOG` is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
    pub debug_layout: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
            debug_layout: false,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            log_filter: env_string_opt(LOG_FILTER_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_file: env_string_opt(LOG_FILE_VAR).map(PathBuf::from),
            debug_layout: env_flag(DEBUG_LAYOUT_VAR),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value.trim().to_string())
        }
    })
}

//! Line-oriented driver for the chat canvas.
//!
//! ## Transport bootstrap
//!
//! `CHAT_CANVAS_TRANSPORT` selects the generation transport:
//!
//! - `mock` (default) for the built-in canned replies
//! - `chat-completions` for an OpenAI-compatible streaming endpoint
//!
//! For `chat-completions`, either set `CHAT_CANVAS_CONFIG_PATH` to a UTF-8 JSON
//! file with this shape:
//!
//! ```json
//! {
//!   "api_key": "sk-...",
//!   "api_url": "https://api.openai.com/v1",
//!   "models": ["gpt-3.5-turbo"],
//!   "timeout_sec": 120
//! }
//! ```
//!
//! or set `CHAT_CANVAS_API_KEY`, plus optionally `CHAT_CANVAS_API_URL` and
//! `CHAT_CANVAS_MODEL`.
//!
//! Contract notes:
//! - `models` must include at least one non-empty model id.
//! - `timeout_sec` is optional and must be > 0 when provided.
//! - Unknown JSON fields are rejected.
//!
//! Logging follows `CHAT_CANVAS_LOG` / `CHAT_CANVAS_LOG_FILE`; set
//! `CHAT_CANVAS_DEBUG_LAYOUT=1` to list layout connectors under `/tree`.

pub mod commands;
pub mod outline;
pub mod providers;
pub mod session;

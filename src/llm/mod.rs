pub mod chat;

use std::time::Duration;

/// Connection and generation settings for the upstream completion API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Forwarded in the request body as `timeout`; the provider decides what to do with it.
    pub timeout_ms: u64,
    /// Enforced locally on the whole HTTP call when set.
    pub request_timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: crate::cli::DEFAULT_CHAT_BASE_URL.to_string(),
            model: "qwen-plus".to_string(),
            temperature: 0.6,
            timeout_ms: 60_000,
            request_timeout: None,
        }
    }
}

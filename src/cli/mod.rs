use clap::Parser;

pub const DEFAULT_CHAT_BASE_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Streams chat completions from an upstream LLM API to the browser", long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:3001")]
    pub server_addr: String,

    /// Optional directory served for paths other than the API routes and `/`.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<String>,

    // --- Chat LLM Provider Args ---
    /// Full URL of the OpenAI-compatible chat completions endpoint.
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_CHAT_BASE_URL)]
    pub chat_base_url: String,

    /// API Key for the Chat LLM provider, sent as a bearer token.
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., qwen-plus, gpt-4o)
    #[arg(long, env = "CHAT_MODEL", default_value = "qwen-plus")]
    pub chat_model: String,

    /// Sampling temperature forwarded upstream (0.0 to 2.0).
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.6")]
    pub chat_temperature: f32,

    /// Generation timeout hint in milliseconds, forwarded in the request body.
    #[arg(long, env = "CHAT_TIMEOUT_MS", default_value = "60000")]
    pub chat_timeout_ms: u64,

    /// Hard deadline in seconds for the whole upstream HTTP call. Unset means no deadline.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    // --- Persona Args ---
    /// Inline system prompt replacing the built-in persona.
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Path to a JSON file of the form {"system_prompt": "..."}. Takes precedence over SYSTEM_PROMPT.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chat", author, version, about = "Terminal chat client for the relay", long_about = None)]
pub struct ClientArgs {
    /// Base URL of the relay server.
    #[arg(long, env = "RELAY_URL", default_value = "http://localhost:3001")]
    pub relay_url: String,

    /// Directory holding the local conversation cache.
    #[arg(long, env = "HISTORY_DIR", default_value = ".chat-history")]
    pub history_dir: String,

    /// Session key; the cache is stored as `<history-dir>/<key>.json`.
    #[arg(long, env = "HISTORY_KEY", default_value = "chatHistory")]
    pub history_key: String,

    /// Do not read or write the local conversation cache.
    #[arg(long, default_value = "false")]
    pub no_history: bool,

    /// Continue the conversation stored under the session key.
    #[arg(long, default_value = "false")]
    pub resume: bool,

    /// Write the transcript as an HTML fragment to this path on exit.
    #[arg(long)]
    pub export_html: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

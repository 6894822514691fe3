pub mod prompt;

use crate::cli::Args;
use crate::error::RelayError;
use crate::llm::LlmConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Everything the relay needs at startup, validated once.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server_addr: SocketAddr,
    pub llm: LlmConfig,
    pub system_prompt: String,
    pub static_dir: Option<PathBuf>,
    pub tls: Option<TlsConfig>,
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Result<Self, RelayError> {
        let server_addr = args.server_addr
            .parse::<SocketAddr>()
            .map_err(|e| RelayError::Config(format!("Invalid server address '{}': {}", args.server_addr, e)))?;

        let api_key = args.chat_api_key.trim();
        if api_key.is_empty() {
            return Err(RelayError::Config("CHAT_API_KEY is required".to_string()));
        }

        let base_url = Url::parse(&args.chat_base_url)
            .map_err(|e| RelayError::Config(format!("Invalid chat base URL '{}': {}", args.chat_base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RelayError::Config(format!("Unsupported URL scheme: {}", base_url.scheme())));
        }

        if !(0.0..=2.0).contains(&args.chat_temperature) {
            return Err(
                RelayError::Config(format!("Temperature must be within 0.0..=2.0, got {}", args.chat_temperature))
            );
        }

        let system_prompt = prompt
            ::resolve_system_prompt(args.system_prompt.as_deref(), args.system_prompt_path.as_deref())
            .map_err(|e| RelayError::Config(e.to_string()))?;

        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                    cert_path: cert_path.clone(),
                    key_path: key_path.clone(),
                }),
                _ => {
                    return Err(
                        RelayError::Config(
                            "Both --tls-cert-path and --tls-key-path must be provided to enable TLS".to_string()
                        )
                    );
                }
            }
        } else {
            None
        };

        Ok(Self {
            server_addr,
            llm: LlmConfig {
                api_key: api_key.to_string(),
                base_url: base_url.to_string(),
                model: args.chat_model.clone(),
                temperature: args.chat_temperature,
                timeout_ms: args.chat_timeout_ms,
                request_timeout: args.upstream_timeout_secs.map(Duration::from_secs),
            },
            system_prompt,
            static_dir: args.static_dir.as_ref().map(PathBuf::from),
            tls,
        })
    }
}

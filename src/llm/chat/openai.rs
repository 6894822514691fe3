use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ create_streaming_response, ChatClient, DeltaStream };
use crate::error::RelayError;
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;
use crate::stream::{ self, classify, SseLine };

/// Client for any OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    temperature: f32,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    temperature: f32,
    timeout: u64,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
}

#[derive(Deserialize, Default)]
struct OpenAIDelta {
    content: Option<String>,
}

/// Extracts the text delta of one streamed event. Events without a delta,
/// such as the leading role announcement, yield `None`.
pub(crate) fn parse_delta(data: &str) -> Result<Option<String>, serde_json::Error> {
    let event: OpenAIStreamResponse = serde_json::from_str(data)?;
    Ok(
        event.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    )
}

impl OpenAIChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|e|
            RelayError::Config(format!("Invalid API key format: {}", e))
        )?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = HttpClient::builder().default_headers(headers);
        if let Some(deadline) = config.request_timeout {
            builder = builder.timeout(deadline);
        }
        let http = builder
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            temperature: config.temperature,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, RelayError> {
        if config.api_key.trim().is_empty() {
            return Err(RelayError::Config("Chat API key is required".to_string()));
        }
        Self::new(config)
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<DeltaStream, RelayError> {
        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
            stream: true,
            temperature: self.temperature,
            timeout: self.timeout_ms,
        };

        let resp = self.http.post(&self.base_url).json(&req).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus { status, body });
        }
        info!("Upstream stream opened: model={}, messages={}", self.model, messages.len());

        Ok(
            create_streaming_response(move |tx| async move {
                let mut lines = Box::pin(stream::lines(resp.bytes_stream()));
                loop {
                    let next = tokio::select! {
                        _ = tx.closed() => {
                            debug!("Downstream closed, dropping upstream response");
                            return;
                        }
                        next = lines.next() => next,
                    };
                    let Some(line) = next else {
                        return;
                    };

                    match line {
                        Ok(line) =>
                            match classify(&line) {
                                SseLine::Data(data) =>
                                    match parse_delta(data) {
                                        Ok(Some(delta)) => {
                                            if tx.send(Ok(delta)).await.is_err() {
                                                return;
                                            }
                                        }
                                        Ok(None) => {}
                                        Err(e) => {
                                            warn!("Failed to parse upstream event: {} for data: {}", e, data);
                                        }
                                    }
                                SseLine::Done => debug!("Upstream sent [DONE]"),
                                SseLine::Ignored => {}
                            }
                        Err(e) => {
                            let _ = tx.send(Err(RelayError::UpstreamStream(e.to_string()))).await;
                            return;
                        }
                    }
                }
            })
        )
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, DeltaStream };
use crate::models::chat::{ ChatMessage, Role };

use futures::{ stream, Stream, StreamExt };
use log::{ error, info, warn };
use std::pin::Pin;
use std::sync::Arc;

pub type RelayEventStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

/// Lifecycle of one relayed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    Streaming,
    Completed,
    Failed,
}

/// What the relay hands to the transport for one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A non-empty text delta, forwarded as `{"content": ...}`.
    Content(String),
    /// Upstream finished cleanly; the transport writes its `[DONE]` sentinel.
    Done,
    /// Upstream broke off after the stream opened. The transport closes the
    /// response without writing anything for this event.
    Aborted(String),
}

/// Stateless apart from immutable configuration, so it is shared across
/// requests without locking.
#[derive(Clone)]
pub struct Relay {
    chat_client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
}

impl Relay {
    pub fn new(chat_client: Arc<dyn ChatClient>, system_prompt: impl Into<String>) -> Self {
        let system_prompt: String = system_prompt.into();
        Self {
            chat_client,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let chat_client = new_chat_client(&config.llm)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Ok(Self::new(chat_client, config.system_prompt.clone()))
    }

    /// Validates the submitted history and puts the persona in front of it.
    pub fn prepare_messages(&self, history: Vec<ChatMessage>) -> Result<Vec<ChatMessage>, RelayError> {
        if let Some(index) = history.iter().position(|m| m.content.trim().is_empty()) {
            return Err(RelayError::InvalidRequest(format!("message {} has empty content", index)));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(Role::System, &*self.system_prompt));
        messages.extend(history);
        Ok(messages)
    }

    /// Opens the upstream stream for `history`.
    ///
    /// Errors here mean nothing has been sent to the caller yet. Once this
    /// returns, the events end with either `Done` or `Aborted`.
    pub async fn open(
        &self,
        request_id: &str,
        history: Vec<ChatMessage>
    ) -> Result<RelayEventStream, RelayError> {
        let messages = self.prepare_messages(history)?;
        info!("[{}] Forwarding {} messages upstream", request_id, messages.len());

        let deltas = self.chat_client.stream_chat(&messages).await.map_err(|e| {
            if e.is_upstream_unavailable() {
                warn!("[{}] Upstream unavailable: {}", request_id, e);
            } else {
                error!("[{}] Could not open upstream stream: {}", request_id, e);
            }
            e
        })?;

        Ok(Box::pin(relay_events(request_id.to_string(), deltas)))
    }
}

/// Drives the `Streaming -> Completed | Failed` state machine over upstream deltas.
pub fn relay_events(request_id: String, deltas: DeltaStream) -> impl Stream<Item = RelayEvent> + Send {
    let state = (deltas, RelayStatus::Streaming, 0usize);

    stream::unfold(state, move |(mut deltas, status, forwarded)| {
        let request_id = request_id.clone();
        async move {
            if status != RelayStatus::Streaming {
                return None;
            }
            match deltas.next().await {
                Some(Ok(content)) => {
                    Some((RelayEvent::Content(content), (deltas, RelayStatus::Streaming, forwarded + 1)))
                }
                Some(Err(e)) => {
                    warn!(
                        "[{}] Upstream stream failed after {} chunks: {}",
                        request_id,
                        forwarded,
                        e
                    );
                    Some((RelayEvent::Aborted(e.to_string()), (deltas, RelayStatus::Failed, forwarded)))
                }
                None => {
                    info!("[{}] Upstream completed after {} chunks", request_id, forwarded);
                    Some((RelayEvent::Done, (deltas, RelayStatus::Completed, forwarded)))
                }
            }
        }
    })
}

//! Streaming consumer side of the chat: keeps the conversation history and
//! renders the reply as it arrives.
pub mod history;
pub mod relay_client;
pub mod render;

use futures::StreamExt;
use log::{ error, info, warn };
use thiserror::Error;

pub use history::HistoryStore;
pub use relay_client::{ RelayClient, ReplyEvent };
pub use render::{ escape_html, HtmlTranscript, Renderer, TerminalRenderer };

use crate::models::chat::ChatMessage;

/// Shown in place of the reply when a turn fails.
pub const APOLOGY: &str =
    "Sorry, I cannot answer right now. The network or the server may be unavailable, please try again later.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to relay failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Invalid relay URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("History cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing was sent or recorded.
    Ignored,
    /// The relay sent its `[DONE]` sentinel.
    Completed(String),
    /// The relay closed the stream without a sentinel. The reply is kept,
    /// same as a completed one. A blank reply is never kept.
    ClosedEarly(String),
    /// Nothing was committed; the placeholder shows [`APOLOGY`].
    Failed,
}

pub struct ChatSession {
    client: RelayClient,
    history: Vec<ChatMessage>,
    store: Option<HistoryStore>,
    input_enabled: bool,
}

impl ChatSession {
    pub fn new(client: RelayClient) -> Self {
        Self {
            client,
            history: Vec::new(),
            store: None,
            input_enabled: true,
        }
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Runs one turn: records the user message, streams the reply into the
    /// renderer and records the reply unless the turn failed.
    pub async fn submit<R: Renderer + ?Sized>(&mut self, input: &str, renderer: &mut R) -> TurnOutcome {
        let text = input.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        self.set_input_enabled(renderer, false);
        renderer.show_user(text);
        self.history.push(ChatMessage::user(text));
        renderer.open_assistant();

        let outcome = match self.receive_reply(renderer).await {
            Ok((reply, true)) => {
                self.commit(reply.clone());
                TurnOutcome::Completed(reply)
            }
            Ok((reply, false)) => {
                warn!("Relay closed the stream without [DONE] after {} bytes", reply.len());
                self.commit(reply.clone());
                TurnOutcome::ClosedEarly(reply)
            }
            Err(e) => {
                error!("Failed to get reply: {}", e);
                renderer.update_assistant(APOLOGY);
                TurnOutcome::Failed
            }
        };

        self.set_input_enabled(renderer, true);
        outcome
    }

    /// Returns the accumulated reply and whether the sentinel was seen.
    async fn receive_reply<R: Renderer + ?Sized>(&self, renderer: &mut R) -> Result<(String, bool), ClientError> {
        let mut events = self.client.stream_reply(&self.history).await?;
        let mut reply = String::new();

        while let Some(event) = events.next().await {
            match event? {
                ReplyEvent::Content(delta) => {
                    reply.push_str(&delta);
                    renderer.update_assistant(&reply);
                }
                ReplyEvent::Done => {
                    return Ok((reply, true));
                }
            }
        }
        Ok((reply, false))
    }

    /// Blank replies are not recorded; the relay refuses blank history entries.
    fn commit(&mut self, reply: String) {
        if reply.trim().is_empty() {
            warn!("Relay reply was empty, not adding it to the history");
            return;
        }
        self.history.push(ChatMessage::assistant(reply));
        if let Some(store) = &self.store {
            match store.save(&self.history) {
                Ok(()) => info!("Conversation cached at {}", store.path().display()),
                Err(e) => warn!("Could not cache conversation at {}: {}", store.path().display(), e),
            }
        }
    }

    fn set_input_enabled<R: Renderer + ?Sized>(&mut self, renderer: &mut R, enabled: bool) {
        self.input_enabled = enabled;
        renderer.set_input_enabled(enabled);
    }
}

pub mod openai;

use async_trait::async_trait;
use futures::{ Future, Stream };
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::error::RelayError;
use crate::models::chat::ChatMessage;

/// Text deltas of one streamed completion, in arrival order.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streamed completion for `messages`.
    ///
    /// Resolves only once the upstream has accepted the request, so a
    /// connection failure or non-success status surfaces here rather than as
    /// the first stream item.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<DeltaStream, RelayError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// Runs `response_fn` on its own task and exposes what it sends as a stream.
///
/// Dropping the stream closes the channel, which the producer can observe
/// through `Sender::closed` to stop reading upstream.
pub fn create_streaming_response<F, Fut>(response_fn: F) -> DeltaStream
    where
        F: FnOnce(mpsc::Sender<Result<String, RelayError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, RelayError> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}

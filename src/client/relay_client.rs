use futures::{ future, Stream, StreamExt };
use log::{ debug, warn };
use std::pin::Pin;
use url::Url;

use super::ClientError;
use crate::models::api::ContentChunk;
use crate::models::chat::{ ChatMessage, ChatRequest };
use crate::stream::{ self, classify, SseLine };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Content(String),
    Done,
}

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<ReplyEvent, ClientError>> + Send>>;

/// HTTP side of the chat client: posts the history and decodes the SSE reply.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl RelayClient {
    pub fn new(relay_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(relay_url)?;
        // keep any path prefix the relay is mounted under
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("api/chat")?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn stream_reply(&self, history: &[ChatMessage]) -> Result<ReplyStream, ClientError> {
        let body = ChatRequest { messages: history.to_vec() };
        let resp = self.http.post(self.endpoint.clone()).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let details = resp.text().await.unwrap_or_default();
            debug!("Relay error body: {}", details);
            return Err(ClientError::Status(status));
        }

        let events = stream::lines(resp.bytes_stream()).filter_map(|line| {
            future::ready(match line {
                Ok(line) => parse_reply_line(&line).map(Ok),
                Err(e) => Some(Err(ClientError::Http(e))),
            })
        });
        Ok(Box::pin(events))
    }
}

fn parse_reply_line(line: &str) -> Option<ReplyEvent> {
    match classify(line) {
        SseLine::Data(data) =>
            match serde_json::from_str::<ContentChunk>(data) {
                Ok(chunk) if !chunk.content.is_empty() => Some(ReplyEvent::Content(chunk.content)),
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to parse relay event: {} for data: {}", e, data);
                    None
                }
            }
        SseLine::Done => Some(ReplyEvent::Done),
        SseLine::Ignored => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relay_lines() {
        assert_eq!(
            parse_reply_line(r#"data: {"content":"Hi"}"#),
            Some(ReplyEvent::Content("Hi".into()))
        );
        assert_eq!(parse_reply_line(r#"data: {"content":""}"#), None);
        assert_eq!(parse_reply_line("data: [DONE]"), Some(ReplyEvent::Done));
        assert_eq!(parse_reply_line("data: {oops"), None);
        assert_eq!(parse_reply_line("retry: 1000"), None);
        assert_eq!(parse_reply_line(""), None);
    }

    #[test]
    fn endpoint_is_joined_to_base() {
        let client = RelayClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:3001/api/chat");
        let client = RelayClient::new("http://localhost:3001").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:3001/api/chat");
        let client = RelayClient::new("https://example.com/coach").unwrap();
        assert_eq!(client.endpoint().as_str(), "https://example.com/coach/api/chat");
        let client = RelayClient::new("https://example.com/coach/").unwrap();
        assert_eq!(client.endpoint().as_str(), "https://example.com/coach/api/chat");
        assert!(matches!(RelayClient::new("not a url"), Err(ClientError::Url(_))));
    }
}

//! Server-sent-events line handling shared by the relay and the client.
pub mod decoder;

use futures::{ stream, Stream, StreamExt };
use std::collections::VecDeque;
use std::pin::Pin;

pub use decoder::LineDecoder;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Payload of a `data: ` line.
    Data(&'a str),
    /// `data: [DONE]`.
    Done,
    /// Blank separators, comments, `event:` fields and anything else.
    Ignored,
}

pub fn classify(line: &str) -> SseLine<'_> {
    match line.strip_prefix(DATA_PREFIX) {
        Some(DONE_SENTINEL) => SseLine::Done,
        Some(data) => SseLine::Data(data),
        None => SseLine::Ignored,
    }
}

struct LineState<S> {
    inner: Pin<Box<S>>,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    exhausted: bool,
}

/// Turns a stream of byte chunks into a stream of decoded lines.
///
/// A read error is yielded once, after every line completed before it, and
/// ends the stream.
pub fn lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, E>> + Send
    where S: Stream<Item = Result<B, E>> + Send + 'static, B: AsRef<[u8]> + Send, E: Send
{
    let state = LineState {
        inner: Box::pin(bytes),
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.exhausted {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let completed = state.decoder.push(chunk.as_ref());
                    state.ready.extend(completed);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.exhausted = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}

use chat_relay::cli::Args;
use chat_relay::client::{ ChatSession, HtmlTranscript, RelayClient, TurnOutcome, APOLOGY };
use chat_relay::config::RelayConfig;
use chat_relay::models::chat::ChatMessage;
use chat_relay::relay::Relay;
use chat_relay::server::api::router;
use clap::Parser;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::sync::oneshot;
use wiremock::matchers::{ body_partial_json, method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

const PERSONA: &str = "You are a patient coach.";

/// Starts the relay against `upstream` and returns its base URL.
async fn start_relay(upstream: &MockServer) -> String {
    start_relay_at(&format!("{}/v1/chat/completions", upstream.uri())).await
}

async fn start_relay_at(upstream_url: &str) -> String {
    let args = Args::try_parse_from([
        "chat-relay",
        "--server-addr",
        "127.0.0.1:0",
        "--chat-api-key",
        "sk-test",
        "--chat-base-url",
        upstream_url,
        "--system-prompt",
        PERSONA,
    ]).unwrap();
    let config = RelayConfig::from_args(&args).unwrap();
    let relay = Relay::from_config(&config).unwrap();

    let listener = tokio::net::TcpListener::bind(config.server_addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(relay, None).into_make_service()).await.unwrap();
    });
    format!("http://{}", addr)
}

fn upstream_event(content: &str) -> String {
    format!("data: {}\n\n", json!({"choices": [{"delta": {"content": content}}]}))
}

#[tokio::test]
async fn hello_scenario_streams_through_the_relay() {
    let upstream = MockServer::start().await;
    let body = format!("{}{}data: [DONE]\n\n", upstream_event("Hi"), upstream_event(" there"));
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(
            body_partial_json(
                json!({
            "stream": true,
            "messages": [
                {"role": "system", "content": PERSONA},
                {"role": "user", "content": "Hello"}
            ]
        })
            )
        )
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&upstream).await;

    let relay_url = start_relay(&upstream).await;
    let mut session = ChatSession::new(RelayClient::new(&relay_url).unwrap());
    let mut transcript = HtmlTranscript::new();

    let outcome = session.submit("Hello", &mut transcript).await;

    assert_eq!(outcome, TurnOutcome::Completed("Hi there".into()));
    assert_eq!(
        session.history(),
        &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there")]
    );
    assert_eq!(transcript.messages()[1].html, "Hi there");
}

#[tokio::test]
async fn upstream_failure_reaches_the_user_as_apology() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&upstream).await;

    let relay_url = start_relay(&upstream).await;

    let raw = reqwest::Client::new()
        .post(format!("{}/api/chat", relay_url))
        .json(&json!({"messages": [{"role": "user", "content": "Hello"}]}))
        .send().await
        .unwrap();
    assert_eq!(raw.status().as_u16(), 500);
    let error: serde_json::Value = raw.json().await.unwrap();
    assert!(error["error"].is_string());

    let mut session = ChatSession::new(RelayClient::new(&relay_url).unwrap());
    let mut transcript = HtmlTranscript::new();
    let outcome = session.submit("Hello", &mut transcript).await;

    assert_eq!(outcome, TurnOutcome::Failed);
    assert_eq!(session.history(), &[ChatMessage::user("Hello")]);
    assert_eq!(transcript.messages()[1].html, chat_relay::client::escape_html(APOLOGY));
}

#[tokio::test]
async fn multibyte_and_markup_survive_the_relay() {
    let upstream = MockServer::start().await;
    let body = format!(
        "{}: comment\n\ndata: {{\"choices\": [oops\n\n{}data: [DONE]\n\n",
        upstream_event("你好，"),
        upstream_event("<b>朋友</b>\n")
    );
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&upstream).await;

    let relay_url = start_relay(&upstream).await;
    let mut session = ChatSession::new(RelayClient::new(&relay_url).unwrap());
    let mut transcript = HtmlTranscript::new();

    let outcome = session.submit("Hi", &mut transcript).await;

    assert_eq!(outcome, TurnOutcome::Completed("你好，<b>朋友</b>\n".into()));
    assert_eq!(transcript.messages()[1].html, "你好，&lt;b&gt;朋友&lt;/b&gt;<br>");
}

#[tokio::test]
async fn empty_reply_does_not_break_later_turns() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: [DONE]\n\n",
                "text/event-stream"
            )
        )
        .up_to_n_times(1)
        .mount(&upstream).await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                format!("{}data: [DONE]\n\n", upstream_event("Still here")),
                "text/event-stream"
            )
        )
        .mount(&upstream).await;

    let relay_url = start_relay(&upstream).await;
    let mut session = ChatSession::new(RelayClient::new(&relay_url).unwrap());
    let mut transcript = HtmlTranscript::new();

    assert_eq!(session.submit("Hello", &mut transcript).await, TurnOutcome::Completed(String::new()));
    assert_eq!(
        session.submit("Are you there?", &mut transcript).await,
        TurnOutcome::Completed("Still here".into())
    );
    assert_eq!(
        session.history(),
        &[
            ChatMessage::user("Hello"),
            ChatMessage::user("Are you there?"),
            ChatMessage::assistant("Still here"),
        ]
    );
}

/// Upstream that sends one delta, then holds the connection open. The
/// receiver fires once the relay hangs up.
async fn stalling_upstream() -> (String, oneshot::Receiver<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let chunk = upstream_event("Hi");
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
            chunk.len(),
            chunk
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(());
    });
    (format!("http://{}/v1/chat/completions", addr), closed_rx)
}

#[tokio::test]
async fn deltas_arrive_before_upstream_ends_and_hangup_stops_upstream() {
    let (upstream_url, upstream_closed) = stalling_upstream().await;
    let relay_url = start_relay_at(&upstream_url).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat", relay_url))
        .json(&json!({"messages": [{"role": "user", "content": "Hello"}]}))
        .send().await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let mut body = resp.bytes_stream();
    let mut received = String::new();
    while !received.ends_with("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next()).await
            .expect("first event should not wait for the upstream to finish")
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert_eq!(received, "data: {\"content\":\"Hi\"}\n\n");

    drop(body);
    tokio::time::timeout(Duration::from_secs(5), upstream_closed).await
        .expect("upstream connection should be dropped after the client hangs up")
        .unwrap();
}

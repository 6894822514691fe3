use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::models::api::{ ContentChunk, HealthResponse };
use crate::models::chat::ChatRequest;
use crate::relay::{ Relay, RelayEvent };
use crate::stream::DONE_SENTINEL;

use std::error::Error;
use std::path::Path;
use axum::{
    routing::{ get, post },
    Router,
    extract::State,
    response::{ sse::{ Event, Sse }, Html, IntoResponse, Response },
    http::header,
    Json,
};
use futures::{ future, StreamExt };
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::ServeDir;
use axum_server::tls_rustls::RustlsConfig;
use log::info;
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Clone)]
struct AppState {
    relay: Relay,
}

pub fn router(relay: Relay, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler));

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).with_state(AppState { relay })
}

pub async fn start_http_server(
    config: &RelayConfig,
    relay: Relay
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = config.server_addr;
    let app = router(relay, config.static_dir.as_deref());

    if let Some(tls) = &config.tls {
        info!(
            "TLS enabled. Loading certificate from '{}' and key from '{}'",
            tls.cert_path,
            tls.key_path
        );
        let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);
        info!("Health check: http://{}/api/health", addr);
        info!("Chat API: http://{}/api/chat", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] Chat request with {} messages", request_id, req.messages.len());

    let events = state.relay.open(&request_id, req.messages).await?;
    let body = events.scan((), |_, event| future::ready(to_sse_event(event)));

    Ok(([(header::CONNECTION, "keep-alive")], Sse::new(body)).into_response())
}

/// `None` ends the response body; an aborted reply closes without a sentinel.
fn to_sse_event(event: RelayEvent) -> Option<Result<Event, axum::Error>> {
    match event {
        RelayEvent::Content(content) => Some(Event::default().json_data(ContentChunk { content })),
        RelayEvent::Done => Some(Ok(Event::default().data(DONE_SENTINEL))),
        RelayEvent::Aborted(_) => None,
    }
}

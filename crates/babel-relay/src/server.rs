use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use babel_core::errors::TranslateError;
use babel_core::lang;
use babel_telemetry::MetricsRecorder;
use babel_translate::Translator;

use crate::client::{self, ClientRegistry};
use crate::handlers::{self, ChatState};
use crate::wire::InboundEvent;

/// Server configuration.
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    pub max_send_queue: usize,
    pub cleanup_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            max_send_queue: 256,
            cleanup_interval_secs: 60,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatState>,
    pub inbound_tx: mpsc::Sender<InboundEvent>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/translate", post(translate_handler))
        .route("/languages", get(languages_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the relay. Returns a handle that keeps its background
/// tasks alive.
pub async fn start(
    config: RelayConfig,
    translator: Arc<dyn Translator>,
    metrics: Option<Arc<MetricsRecorder>>,
) -> Result<RelayHandle, std::io::Error> {
    let clients = Arc::new(ClientRegistry::new(config.max_send_queue));

    let mut chat = ChatState::new(Arc::clone(&clients), translator);
    if let Some(m) = metrics {
        chat = chat.with_metrics(m);
    }
    let chat = Arc::new(chat);

    // All protocol events funnel through one queue with one consumer, so
    // registry and room mutations never interleave.
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEvent>(1024);
    let events_handle = tokio::spawn(process_inbound(inbound_rx, Arc::clone(&chat)));

    let cleanup_handle = client::start_cleanup_task(
        Arc::clone(&clients),
        Duration::from_secs(config.cleanup_interval_secs),
    );

    let app_state = AppState {
        chat,
        inbound_tx,
    };

    let router = build_router(app_state);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "relay server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(RelayHandle {
        port: local_addr.port(),
        _server: server_handle,
        _events: events_handle,
        _cleanup: cleanup_handle,
    })
}

/// Handle returned by `start()` — keeps background tasks alive.
pub struct RelayHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
    _events: tokio::task::JoinHandle<()>,
    _cleanup: tokio::task::JoinHandle<()>,
}

/// Single consumer of the inbound event queue. Events are processed one
/// at a time, which is what serializes all registry and room mutation —
/// including disconnects, which arrive as `Closed` markers behind any
/// frames the connection sent before going away.
async fn process_inbound(mut rx: mpsc::Receiver<InboundEvent>, chat: Arc<ChatState>) {
    while let Some(event) = rx.recv().await {
        match event {
            InboundEvent::Frame(connection_id, raw) => {
                handlers::dispatch(&chat, &connection_id, &raw);
            }
            InboundEvent::Closed(connection_id) => {
                handlers::on_disconnect(&chat, &connection_id);
            }
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one WebSocket connection from registration to disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (connection_id, rx) = state.chat.clients.register();
    if let Some(m) = &state.chat.metrics {
        m.gauge_add("ws.connections.active", &[], 1);
    }

    handlers::on_connect(&state.chat, &connection_id);

    client::handle_ws_connection(
        socket,
        connection_id.clone(),
        rx,
        Arc::clone(&state.chat.clients),
        state.inbound_tx.clone(),
    )
    .await;

    // Queue the disconnect behind any frames already in flight. If the
    // event loop is gone, the process is shutting down anyway.
    let _ = state
        .inbound_tx
        .send(InboundEvent::Closed(connection_id))
        .await;
    if let Some(m) = &state.chat.metrics {
        m.gauge_add("ws.connections.active", &[], -1);
    }
}

#[derive(Debug, Deserialize)]
struct TranslateRequest {
    text: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    translated_text: String,
    source_lang: String,
    target_lang: String,
}

/// Error payload still echoes the original text so clients can fall back
/// to showing it untranslated.
#[derive(Debug, Serialize)]
struct TranslateFailure {
    error: String,
    translated_text: String,
}

/// Pass-through to the translation gateway. No retries, no extra logic.
async fn translate_handler(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> Response {
    let text = req.text.unwrap_or_default();
    let source = req.source.unwrap_or_else(|| lang::AUTO.to_string());
    let target = req.target.unwrap_or_else(|| "en".to_string());

    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(TranslateFailure {
                error: "No text provided".to_string(),
                translated_text: text,
            }),
        )
            .into_response();
    }

    let started = Instant::now();
    let result = state.chat.translator.translate(&text, &source, &target).await;
    if let Some(m) = &state.chat.metrics {
        m.histogram_observe(
            "translate.duration_ms",
            &[("provider", state.chat.translator.name())],
            started.elapsed().as_millis() as f64,
        );
    }

    match result {
        Ok(translation) => Json(TranslateResponse {
            translated_text: translation.text,
            source_lang: translation.detected_source,
            target_lang: target,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(kind = e.error_kind(), "translation failed: {e}");
            if let Some(m) = &state.chat.metrics {
                m.counter_inc("translate.errors.total", &[("kind", e.error_kind())], 1);
            }
            let status = if e.is_caller_error() {
                StatusCode::BAD_REQUEST
            } else if matches!(e, TranslateError::Timeout(_)) {
                StatusCode::GATEWAY_TIMEOUT
            } else {
                StatusCode::BAD_GATEWAY
            };
            (
                status,
                Json(TranslateFailure {
                    error: e.to_string(),
                    translated_text: text,
                }),
            )
                .into_response()
        }
    }
}

/// The language table offered to chat clients.
async fn languages_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "languages": lang::SUPPORTED }))
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "connections": state.chat.clients.count(),
    }))
}

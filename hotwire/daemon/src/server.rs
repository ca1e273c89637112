//! Daemon Server Implementation
//!
//! A small multi-room chat that exercises both halves of hotwire:
//! - room pages are [`View`]s with a `messages` frame, rendered by the
//!   frame middleware
//! - every room is a wire; posting a message appends it to the `messages`
//!   list of every browser subscribed to that room
//!
//! ```text
//!   POST /rooms/lobby/messages ──► rooms["lobby"].push(msg)
//!                                      │
//!                         Cable::wire("lobby").append("messages", "message")
//!                                      │
//!                ┌─────────────────────┼─────────────────────┐
//!             conn-1                conn-2                conn-3
//!        (browser tab)          (browser tab)         (browser tab)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hotwire_core::{
    frame, handle_wire_socket, Cable, FileTemplateRenderer, FrameLayer, HotwireConfig,
    RenderState, TemplateRenderer, View, WireRegistry,
};

/// Room the index page redirects to
pub const DEFAULT_ROOM: &str = "lobby";

/// How often dead wire connections are swept
const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

/// One posted chat message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Position in the room, starting at 1
    pub id: u64,
    /// Message text
    pub text: String,
}

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    cable: Cable,
    rooms: Arc<DashMap<String, Vec<ChatMessage>>>,
    wire_path: String,
    connection_capacity: usize,
}

impl AppState {
    /// Create state around a cable
    #[must_use]
    pub fn new(cable: Cable, wire_path: impl Into<String>, connection_capacity: usize) -> Self {
        Self {
            cable,
            rooms: Arc::new(DashMap::new()),
            wire_path: wire_path.into(),
            connection_capacity,
        }
    }

    /// Store a message and return it with its id
    fn post(&self, room: &str, text: String) -> ChatMessage {
        let mut messages = self.rooms.entry(room.to_string()).or_default();
        let id = u64::try_from(messages.len()).unwrap_or(u64::MAX).saturating_add(1);
        let message = ChatMessage { id, text };
        messages.push(message.clone());
        message
    }

    fn messages(&self, room: &str) -> Vec<ChatMessage> {
        self.rooms
            .get(room)
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    fn room_view(&self, room: &str) -> View {
        let state = RenderState::new(json!({
            "room": room,
            "wire_path": self.wire_path,
            "messages": self.messages(room),
        }));
        View::new(state)
            .with("layout/top")
            .with(frame("messages", "messages"))
            .with("form")
            .with("layout/bottom")
    }
}

/// Room names double as wire names and URL segments
fn is_valid_room(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Deserialize)]
struct NewMessage {
    message: String,
}

async fn index() -> Redirect {
    Redirect::to(&format!("/rooms/{DEFAULT_ROOM}"))
}

async fn show_room(State(state): State<AppState>, Path(room): Path<String>) -> Response {
    if !is_valid_room(&room) {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.room_view(&room).into_response()
}

async fn post_message(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Form(form): Form<NewMessage>,
) -> Response {
    if !is_valid_room(&room) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let text = form.message.trim();
    if text.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, state.room_view(&room)).into_response();
    }

    let message = state.post(&room, text.to_string());
    let message_state = match RenderState::from_serialize(&message) {
        Ok(message_state) => message_state,
        Err(e) => {
            error!(room = %room, error = %e, "Failed to serialize message");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match state
        .cable
        .wire(room.as_str(), message_state)
        .append("messages", "message")
        .await
    {
        Ok(result) => debug!(
            room = %room,
            message_id = message.id,
            recipients = result.recipients(),
            failed = result.failed,
            "Message broadcast"
        ),
        // the message is stored; subscribers catch up on their next page load
        Err(e) => error!(room = %room, error = %e, "Failed to broadcast message"),
    }

    Redirect::to(&format!("/rooms/{room}")).into_response()
}

async fn wire_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let registry = state.cable.registry().clone();
    let capacity = state.connection_capacity;
    ws.on_upgrade(move |socket| handle_wire_socket(socket, registry, capacity))
}

/// Build the application router
#[must_use]
pub fn build_router(state: AppState, layer: &FrameLayer) -> Router {
    let wire_path = state.wire_path.clone();
    let routes = Router::new()
        .route("/", get(index))
        .route("/rooms/:room", get(show_room))
        .route("/rooms/:room/messages", post(post_message))
        .route(&wire_path, get(wire_socket))
        .with_state(state);
    layer.wrap(routes)
}

/// Periodically drop wire connections whose sockets have gone away
#[must_use]
pub fn spawn_cleanup_task(registry: WireRegistry, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.cleanup_disconnected();
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Run the server until a shutdown signal arrives
pub async fn run(config: HotwireConfig) -> Result<()> {
    let addr = config.socket_addr()?;

    if !tokio::fs::try_exists(&config.templates.directory)
        .await
        .unwrap_or(false)
    {
        warn!(
            path = %config.templates.directory.display(),
            "Template directory does not exist"
        );
    }

    let renderer: Arc<dyn TemplateRenderer> =
        Arc::new(FileTemplateRenderer::new(config.templates.clone()));
    let registry = WireRegistry::new();
    let cable = Cable::new(Arc::clone(&renderer), registry.clone());
    let layer = FrameLayer::new(renderer).with_header(config.frame_header.clone());

    let state = AppState::new(cable, config.wire_path.clone(), config.connection_channel_capacity);
    let app = build_router(state, &layer);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        address = %addr,
        wire_path = %config.wire_path,
        templates = %config.templates.directory.display(),
        engine = %config.templates.engine,
        "Listening for connections"
    );

    let cleanup = spawn_cleanup_task(registry.clone(), CLEANUP_INTERVAL);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    cleanup.abort();
    served.context("Server error")?;

    let summary = registry.summary();
    info!(
        wires = summary.total_wires,
        connections = summary.total_connections,
        "Server stopped"
    );
    Ok(())
}

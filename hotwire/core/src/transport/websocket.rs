//! WebSocket endpoint for wires
//!
//! Each socket gets its own [`WireConnection`] backed by a bounded queue and a
//! writer task that drains the queue into the socket. The read side accepts
//! control messages:
//!
//! ```json
//! {"join": "greetings"}
//! {"leave": "greetings"}
//! ```
//!
//! Frames that are not valid control messages are logged and ignored. When
//! the socket closes the connection leaves every wire it had joined.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::wires::{WireConnection, WireRegistry};

/// Outbound queue size used by [`wire_socket_handler`]
pub const DEFAULT_CONNECTION_CAPACITY: usize = 64;

/// Message a client sends to manage its subscriptions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMessage {
    /// Subscribe to a wire
    Join(String),
    /// Unsubscribe from a wire
    Leave(String),
}

impl ControlMessage {
    /// Wire this message refers to
    #[must_use]
    pub fn wire(&self) -> &str {
        match self {
            Self::Join(name) | Self::Leave(name) => name,
        }
    }

    /// Apply this message to the registry on behalf of `connection`
    pub fn apply(&self, registry: &WireRegistry, connection: &WireConnection) {
        match self {
            Self::Join(name) => {
                registry.join(name, connection);
                tracing::debug!(channel = %name, connection_id = %connection.id(), "Joined wire");
            }
            Self::Leave(name) => {
                let removed = registry.leave(name, &connection.id());
                tracing::debug!(
                    channel = %name,
                    connection_id = %connection.id(),
                    removed,
                    "Left wire"
                );
            }
        }
    }
}

/// Axum handler upgrading a request to a wire socket
///
/// ```ignore
/// let app = Router::new()
///     .route("/wire", get(wire_socket_handler))
///     .with_state(registry);
/// ```
pub async fn wire_socket_handler(
    ws: WebSocketUpgrade,
    State(registry): State<WireRegistry>,
) -> Response {
    ws.on_upgrade(move |socket| handle_wire_socket(socket, registry, DEFAULT_CONNECTION_CAPACITY))
}

/// Serve one upgraded socket until it closes
///
/// `capacity` bounds the messages queued for this socket; a zero value is
/// treated as one.
pub async fn handle_wire_socket(socket: WebSocket, registry: WireRegistry, capacity: usize) {
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
    let connection = WireConnection::new(tx);
    let id = connection.id();
    let (mut sink, mut stream) = socket.split();

    tracing::info!(connection_id = %id, "Wire socket connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(message)).await {
                tracing::debug!(connection_id = %id, error = %e, "Wire socket write failed");
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ControlMessage>(&text) {
                Ok(control) => control.apply(&registry, &connection),
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "Ignoring malformed control message");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "Wire socket read failed");
                break;
            }
        }
    }

    let wires = registry.leave_all(&id);
    drop(connection);
    writer.abort();

    tracing::info!(connection_id = %id, wires, "Wire socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_control_message_wire_format() {
        let join: ControlMessage = serde_json::from_str(r#"{"join":"greetings"}"#).unwrap();
        assert_eq!(join, ControlMessage::Join("greetings".to_string()));

        let leave: ControlMessage = serde_json::from_str(r#"{"leave":"greetings"}"#).unwrap();
        assert_eq!(leave.wire(), "greetings");

        assert_eq!(
            serde_json::to_string(&ControlMessage::Join("room".to_string())).unwrap(),
            r#"{"join":"room"}"#
        );
    }

    #[test]
    fn test_malformed_control_messages_are_rejected() {
        for bad in [r#"{"subscribe":"x"}"#, r#"{"join":1}"#, "join", "{}"] {
            assert!(serde_json::from_str::<ControlMessage>(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_apply_join_and_leave() {
        let registry = WireRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let connection = WireConnection::new(tx);

        ControlMessage::Join("greetings".to_string()).apply(&registry, &connection);
        ControlMessage::Join("greetings".to_string()).apply(&registry, &connection);
        assert_eq!(registry.subscriber_count("greetings"), 1);

        ControlMessage::Leave("greetings".to_string()).apply(&registry, &connection);
        ControlMessage::Leave("greetings".to_string()).apply(&registry, &connection);
        assert_eq!(registry.subscriber_count("greetings"), 0);
    }
}

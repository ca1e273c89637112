//! Transport glue between browsers and the wire registry
//!
//! The only transport is WebSocket. A browser opens a socket, then sends
//! small JSON control messages to join or leave wires; everything pushed to
//! those wires arrives on the socket as `<turbo-stream>` text frames.

pub mod websocket;

pub use websocket::{handle_wire_socket, wire_socket_handler, ControlMessage};

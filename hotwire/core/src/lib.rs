//! Hotwire Core - Turbo Frames and Turbo Streams for axum
//!
//! This crate lets a request handler answer with a list of named HTML
//! fragments instead of one page, and lets the same fragments be pushed to
//! connected browsers over WebSockets.
//!
//! # Architecture
//!
//! ```text
//!   HTTP request ──► handler ──► View [top, frame("list", ..), bottom]
//!                                 │
//!                           FrameLayer (turbo-frame header?)
//!                        ┌────────┴─────────┐
//!                   full page          one <turbo-frame>
//!
//!   handler ──► Cable::wire("chat", state) ──► Wire::append(target, template)
//!                                                 │ render once
//!                                                 ▼
//!                      WireRegistry["chat"] ──► conn-1, conn-2, ...
//!                                                 ▲
//!                     WebSocket {"join": "chat"} ─┘
//! ```
//!
//! # Key Types
//!
//! - [`Fragment`]: a template reference or a named frame
//! - [`View`]: the fragments a handler produced, plus their render state
//! - [`FrameDispatcher`] / [`FrameLayer`]: full-page vs targeted-frame rendering
//! - [`WireRegistry`]: channel name to subscribed connections
//! - [`Cable`] / [`Wire`]: stream-action broadcasting to one channel
//! - [`TemplateRenderer`]: pluggable template rendering, with
//!   [`FileTemplateRenderer`] as the file-backed default
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{routing::get, Router};
//! use hotwire_core::{frame, FileTemplateRenderer, FrameLayer, RenderState, TemplateConfig, View};
//!
//! let renderer = Arc::new(FileTemplateRenderer::new(TemplateConfig::new("templates")));
//! let routes = Router::new().route("/", get(|| async {
//!     View::new(RenderState::empty())
//!         .with("top")
//!         .with(frame("list", "body-list"))
//!         .with("bottom")
//! }));
//! let app = FrameLayer::new(renderer).wrap(routes);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fragment;
pub mod frame;
pub mod stream;
pub mod template;
pub mod transport;
pub mod wires;

pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, FramesToml, HotwireConfig, HotwireToml, ServerToml, TemplatesToml,
};
pub use fragment::{frame, frame_not_found_body, wrap_in_frame, wrap_in_stream, Fragment};
pub use frame::{
    frame_middleware, requested_frame, FrameDispatcher, FrameLayer, View, DEFAULT_FRAME_HEADER,
};
pub use stream::{Cable, StreamAction, Wire};
pub use template::{
    FileTemplateRenderer, RenderError, RenderState, TemplateConfig, TemplateEngine,
    TemplateRenderer,
};
pub use transport::websocket::{handle_wire_socket, wire_socket_handler, ControlMessage};
pub use wires::{BroadcastResult, ConnectionId, RegistrySummary, WireConnection, WireRegistry};

//! Turbo Streams - pushing fragments to wires
//!
//! A [`Cable`] ties a [`TemplateRenderer`] to a [`WireRegistry`]. Handlers
//! ask the cable for a [`Wire`] handle bound to a channel name and a render
//! state, then call one of the seven stream actions on it:
//!
//! ```ignore
//! let wire = cable.wire("greetings", state);
//! wire.append("greetings", "fragments/message").await?;
//! ```
//!
//! Each action renders the template once and delivers
//! `<turbo-stream target=".." action=".."><template>..</template></turbo-stream>`
//! to every connection currently subscribed to the wire.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::fragment::{wrap_in_stream, Fragment};
use crate::template::{RenderError, RenderState, TemplateRenderer};
use crate::wires::{BroadcastResult, ConnectionId, WireConnection, WireRegistry};

/// DOM mutation performed by a stream message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamAction {
    /// Append to the target's children
    Append,
    /// Prepend to the target's children
    Prepend,
    /// Replace the target element
    Replace,
    /// Replace the target's children
    Update,
    /// Remove the target element
    Remove,
    /// Insert before the target element
    Before,
    /// Insert after the target element
    After,
}

impl StreamAction {
    /// Every action, in declaration order
    pub const ALL: [StreamAction; 7] = [
        Self::Append,
        Self::Prepend,
        Self::Replace,
        Self::Update,
        Self::Remove,
        Self::Before,
        Self::After,
    ];

    /// The `action` attribute value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Replace => "replace",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for StreamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown stream action: {s}"))
    }
}

/// Factory for [`Wire`] handles sharing one registry and renderer
#[derive(Clone)]
pub struct Cable {
    renderer: Arc<dyn TemplateRenderer>,
    registry: WireRegistry,
}

impl Cable {
    /// Create a cable over an existing registry
    #[must_use]
    pub fn new(renderer: Arc<dyn TemplateRenderer>, registry: WireRegistry) -> Self {
        Self { renderer, registry }
    }

    /// The registry wires are looked up in
    #[must_use]
    pub fn registry(&self) -> &WireRegistry {
        &self.registry
    }

    /// Get a handle to a wire, bound to a render state snapshot
    #[must_use]
    pub fn wire(&self, name: impl Into<String>, state: RenderState) -> Wire {
        Wire {
            name: name.into(),
            state,
            renderer: Arc::clone(&self.renderer),
            registry: self.registry.clone(),
        }
    }
}

impl fmt::Debug for Cable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cable")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Handle to one wire, bound to the render state it was created with
///
/// Action calls are not serialized: two calls issued without awaiting the
/// first may reach a subscriber in either order.
#[derive(Clone)]
pub struct Wire {
    name: String,
    state: RenderState,
    renderer: Arc<dyn TemplateRenderer>,
    registry: WireRegistry,
}

impl Wire {
    /// Wire name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render state every action renders against
    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Subscribe a connection to this wire
    pub fn join(&self, connection: &WireConnection) {
        self.registry.join(&self.name, connection);
    }

    /// Unsubscribe a connection from this wire
    pub fn leave(&self, id: &ConnectionId) -> bool {
        self.registry.leave(&self.name, id)
    }

    /// Render `template` and deliver it to every subscriber as `action`
    ///
    /// Nothing is rendered when the wire has no subscribers. A subscriber
    /// that cannot be reached is reported in the result and does not stop
    /// delivery to the others; only a render failure is an error.
    pub async fn dispatch(
        &self,
        action: StreamAction,
        target: &str,
        template: &str,
    ) -> Result<BroadcastResult, RenderError> {
        let subscribers = self.registry.subscribers(&self.name);
        if subscribers.is_empty() {
            tracing::trace!(wire = %self.name, action = %action, "No subscribers, skipping render");
            return Ok(BroadcastResult::empty());
        }

        let content = self
            .renderer
            .render(&Fragment::template(template), &self.state)
            .await?;
        let message = wrap_in_stream(target, action.as_str(), &content);

        let mut result = BroadcastResult::empty();
        for conn in &subscribers {
            if conn.send(message.clone()) {
                result.successful += 1;
            } else {
                tracing::warn!(
                    wire = %self.name,
                    connection_id = %conn.id(),
                    "Failed to deliver stream message"
                );
                result.failed += 1;
                result.failed_ids.push(conn.id());
            }
        }

        tracing::debug!(
            wire = %self.name,
            action = %action,
            target = target,
            successful = result.successful,
            failed = result.failed,
            "Stream message broadcast"
        );
        Ok(result)
    }

    /// Append the rendered template to `target`
    pub async fn append(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Append, target, template).await
    }

    /// Prepend the rendered template to `target`
    pub async fn prepend(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Prepend, target, template).await
    }

    /// Replace `target` with the rendered template
    pub async fn replace(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Replace, target, template).await
    }

    /// Replace the contents of `target` with the rendered template
    pub async fn update(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Update, target, template).await
    }

    /// Remove `target`
    pub async fn remove(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Remove, target, template).await
    }

    /// Insert the rendered template before `target`
    pub async fn before(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::Before, target, template).await
    }

    /// Insert the rendered template after `target`
    pub async fn after(&self, target: &str, template: &str) -> Result<BroadcastResult, RenderError> {
        self.dispatch(StreamAction::After, target, template).await
    }
}

impl fmt::Debug for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wire")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

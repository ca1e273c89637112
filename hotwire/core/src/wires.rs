//! Wire Registry - Named Broadcast Channels
//!
//! A wire is a named group of connections that all receive the same stream
//! messages, e.g. one wire per chat room or one per repository. The
//! `WireRegistry` owns every wire in the process and lets the transport layer
//! join and leave connections as sockets come and go.
//!
//! # Architecture
//!
//! ```text
//!                      WireRegistry
//!          ┌──────────────────────────────────────────────┐
//!          │ channels:    name -> {ConnectionId -> conn}  │
//!          │ memberships: ConnectionId -> {name}          │
//!          │   - wrapped in Arc<RwLock<>>                 │
//!          └───────────────────┬──────────────────────────┘
//!                              │
//!           ┌──────────────────┼──────────────────┐
//!    ┌──────▼──────┐    ┌──────▼──────┐    ┌──────▼──────┐
//!    │ "greetings" │    │   "room-1"  │    │   "room-2"  │
//!    │ conn-1,2    │    │ conn-2      │    │ (empty)     │
//!    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! # Thread Safety
//!
//! The registry is shared by every request and every socket task. Reads
//! (fan-out) and writes (join/leave) go through a `parking_lot::RwLock` that
//! is never held across an `.await`: [`WireRegistry::subscribers`] hands out
//! a snapshot, so a `leave` that runs while a broadcast is rendering cannot
//! disturb the iteration.
//!
//! Each registry is an ordinary value. Clones share state; separate
//! instances (one per test, say) are fully independent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Unique identifier for a client connection
///
/// Each connection is assigned a unique ID when it connects.
/// This ID is stable for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new unique connection ID
    #[must_use]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Create a connection ID from a raw value (for testing or deserialization)
    #[cfg(test)]
    #[must_use]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A connection that can be subscribed to wires
///
/// Wraps the sending half of the channel drained by the connection's writer
/// task. Clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct WireConnection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl WireConnection {
    /// Create a connection with a fresh ID
    #[must_use]
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self::with_id(ConnectionId::new(), tx)
    }

    /// Create a connection with a known ID
    #[must_use]
    pub fn with_id(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self { id, tx }
    }

    /// Connection identifier
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message for this connection without waiting
    ///
    /// Returns false if the writer is gone or its queue is full.
    pub fn send(&self, message: String) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Outbound queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Check if the writer side is still alive
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Result of a broadcast operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Number of connections that received the message successfully
    pub successful: usize,
    /// Number of connections that failed to receive the message
    pub failed: usize,
    /// IDs of connections that failed
    pub failed_ids: Vec<ConnectionId>,
}

impl BroadcastResult {
    /// A broadcast that had nobody to deliver to
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of connections the broadcast was attempted on
    #[must_use]
    pub fn recipients(&self) -> usize {
        self.successful + self.failed
    }

    /// Check if all recipients received the message
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Default)]
struct Inner {
    channels: HashMap<String, HashMap<ConnectionId, WireConnection>>,
    memberships: HashMap<ConnectionId, HashSet<String>>,
}

impl Inner {
    fn remove(&mut self, channel: &str, id: &ConnectionId) -> bool {
        let Some(members) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = members.remove(id).is_some();
        if members.is_empty() {
            self.channels.remove(channel);
        }
        if let Some(names) = self.memberships.get_mut(id) {
            names.remove(channel);
            if names.is_empty() {
                self.memberships.remove(id);
            }
        }
        removed
    }
}

/// Registry of wires and their subscribed connections
#[derive(Clone, Default)]
pub struct WireRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl WireRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a wire, creating the wire if needed
    ///
    /// Joining twice is a no-op.
    pub fn join(&self, channel: &str, connection: &WireConnection) {
        let mut inner = self.inner.write();
        let id = connection.id();
        let joined = inner
            .channels
            .entry(channel.to_string())
            .or_default()
            .insert(id, connection.clone())
            .is_none();
        inner
            .memberships
            .entry(id)
            .or_default()
            .insert(channel.to_string());

        if joined {
            tracing::debug!(channel = %channel, connection_id = %id, "Connection joined wire");
        }
    }

    /// Unsubscribe a connection from a wire
    ///
    /// Leaving a wire the connection never joined, or a wire that does not
    /// exist, is a no-op. Returns true if the connection was a member.
    pub fn leave(&self, channel: &str, id: &ConnectionId) -> bool {
        let removed = self.inner.write().remove(channel, id);
        if removed {
            tracing::debug!(channel = %channel, connection_id = %id, "Connection left wire");
        }
        removed
    }

    /// Remove a connection from every wire it joined
    ///
    /// Returns the number of wires it was removed from.
    pub fn leave_all(&self, id: &ConnectionId) -> usize {
        let mut inner = self.inner.write();
        let Some(names) = inner.memberships.remove(id) else {
            return 0;
        };
        let mut removed = 0;
        for name in &names {
            if inner.remove(name, id) {
                removed += 1;
            }
        }
        tracing::debug!(connection_id = %id, wires = removed, "Connection left all wires");
        removed
    }

    /// Snapshot of the connections subscribed to a wire
    ///
    /// Unknown wires have no subscribers.
    #[must_use]
    pub fn subscribers(&self, channel: &str) -> Vec<WireConnection> {
        self.inner
            .read()
            .channels
            .get(channel)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections subscribed to a wire
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .read()
            .channels
            .get(channel)
            .map_or(0, HashMap::len)
    }

    /// Check if a connection is subscribed to a wire
    #[must_use]
    pub fn contains(&self, channel: &str, id: &ConnectionId) -> bool {
        self.inner
            .read()
            .channels
            .get(channel)
            .is_some_and(|members| members.contains_key(id))
    }

    /// Names of the wires a connection belongs to
    #[must_use]
    pub fn channels_of(&self, id: &ConnectionId) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .read()
            .memberships
            .get(id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of wires with at least one subscriber
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.read().channels.len()
    }

    /// Remove connections whose writer has gone away
    ///
    /// Returns the number of connections removed.
    pub fn cleanup_disconnected(&self) -> usize {
        let stale: Vec<ConnectionId> = {
            let inner = self.inner.read();
            inner
                .channels
                .values()
                .flat_map(HashMap::values)
                .filter(|conn| !conn.is_connected())
                .map(WireConnection::id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };

        for id in &stale {
            tracing::info!(connection_id = %id, "Removing disconnected connection");
            self.leave_all(id);
        }
        if !stale.is_empty() {
            tracing::info!(
                removed = stale.len(),
                remaining_wires = self.channel_count(),
                "Cleaned up disconnected connections"
            );
        }
        stale.len()
    }

    /// Get a summary of all wires
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let inner = self.inner.read();
        RegistrySummary {
            total_wires: inner.channels.len(),
            total_connections: inner.memberships.len(),
            by_wire: inner
                .channels
                .iter()
                .map(|(name, members)| (name.clone(), members.len()))
                .collect(),
        }
    }
}

impl fmt::Debug for WireRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("WireRegistry")
            .field("wire_count", &inner.channels.len())
            .field("wires", &inner.channels.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Summary of registered wires
#[derive(Debug, Clone)]
pub struct RegistrySummary {
    /// Number of wires with at least one subscriber
    pub total_wires: usize,
    /// Number of distinct connections subscribed to any wire
    pub total_connections: usize,
    /// Subscriber count by wire name
    pub by_wire: HashMap<String, usize>,
}

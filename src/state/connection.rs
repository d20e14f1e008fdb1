//! Connection state management.
//!
//! Tracks live connections, where each one delivers its outbound messages,
//! and which `(room, player)` session it is bound to. The registry has its
//! own lock so connection bookkeeping never waits on a room.

use std::collections::HashMap;
use std::fmt;
use std::sync::{mpsc, Arc};

use parking_lot::RwLock;
use uuid::Uuid;

use super::message::ServerMessage;

/// Opaque identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The room and player a connection is acting as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    pub room_code: String,
    pub player_id: String,
}

impl Session {
    pub fn new(room_code: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            room_code: room_code.into(),
            player_id: player_id.into(),
        }
    }
}

/// Outbound half of a connection, implemented by the gateway.
///
/// `send` must not block on the network; queue the message and return.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: &ServerMessage) -> Result<(), SendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    Failed(String),
}

impl MessageSink for mpsc::Sender<ServerMessage> {
    fn send(&self, message: &ServerMessage) -> Result<(), SendError> {
        mpsc::Sender::send(self, message.clone()).map_err(|_| SendError::Closed)
    }
}

/// State for a single connection.
#[derive(Clone)]
pub struct Connection {
    pub id: ConnectionId,

    /// Where outbound messages go
    pub sink: Arc<dyn MessageSink>,

    /// Bound session, once the connection has created or joined a room
    pub session: Option<Session>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(id: ConnectionId, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            id,
            sink,
            session: None,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    /// Connections by ID
    connections: HashMap<ConnectionId, Connection>,

    /// Room code to bound connections, in bind order
    room_index: HashMap<String, Vec<ConnectionId>>,
}

impl Registry {
    fn detach(&mut self, id: ConnectionId) -> Option<Session> {
        let session = self.connections.get_mut(&id)?.session.take()?;
        if let Some(ids) = self.room_index.get_mut(&session.room_code) {
            ids.retain(|c| *c != id);
            if ids.is_empty() {
                self.room_index.remove(&session.room_code);
            }
        }
        Some(session)
    }
}

/// Session registry - tracks all live connections and their bindings.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Registry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, unbound connection.
    pub fn register(&self, id: ConnectionId, sink: Arc<dyn MessageSink>) {
        self.inner
            .write()
            .connections
            .insert(id, Connection::new(id, sink));
    }

    /// Forget a connection. Returns the session it was bound to, if any.
    pub fn deregister(&self, id: ConnectionId) -> Option<Session> {
        let mut inner = self.inner.write();
        let session = inner.detach(id);
        inner.connections.remove(&id);
        session
    }

    /// Bind a registered connection to a session, replacing any previous one.
    ///
    /// Returns false for an unknown connection.
    pub fn bind(&self, id: ConnectionId, session: Session) -> bool {
        let mut inner = self.inner.write();
        if !inner.connections.contains_key(&id) {
            return false;
        }
        inner.detach(id);

        inner
            .room_index
            .entry(session.room_code.clone())
            .or_default()
            .push(id);
        if let Some(conn) = inner.connections.get_mut(&id) {
            conn.session = Some(session);
        }
        true
    }

    /// Drop every binding for one player in one room.
    pub fn unbind_player(&self, room_code: &str, player_id: &str) -> Vec<ConnectionId> {
        let mut inner = self.inner.write();
        let ids: Vec<ConnectionId> = inner
            .room_index
            .get(room_code)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| {
                inner
                    .connections
                    .get(id)
                    .and_then(|c| c.session.as_ref())
                    .is_some_and(|s| s.player_id == player_id)
            })
            .collect();

        for id in &ids {
            inner.detach(*id);
        }
        ids
    }

    /// Drop every binding to a room.
    pub fn unbind_room(&self, room_code: &str) -> Vec<ConnectionId> {
        let mut inner = self.inner.write();
        let ids = inner.room_index.remove(room_code).unwrap_or_default();
        for id in &ids {
            if let Some(conn) = inner.connections.get_mut(id) {
                conn.session = None;
            }
        }
        ids
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.inner.read().connections.contains_key(&id)
    }

    /// Session a connection is bound to.
    pub fn session(&self, id: ConnectionId) -> Option<Session> {
        self.inner
            .read()
            .connections
            .get(&id)
            .and_then(|c| c.session.clone())
    }

    pub fn sink(&self, id: ConnectionId) -> Option<Arc<dyn MessageSink>> {
        self.inner
            .read()
            .connections
            .get(&id)
            .map(|c| Arc::clone(&c.sink))
    }

    /// Sinks for every connection bound to a room except `exclude`.
    pub fn sinks_for_room(
        &self,
        room_code: &str,
        exclude: Option<ConnectionId>,
    ) -> Vec<(ConnectionId, Arc<dyn MessageSink>)> {
        let inner = self.inner.read();
        inner
            .room_index
            .get(room_code)
            .into_iter()
            .flatten()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| {
                inner
                    .connections
                    .get(id)
                    .map(|c| (*id, Arc::clone(&c.sink)))
            })
            .collect()
    }
}

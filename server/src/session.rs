//! Connection session management and player binding for the game server
//!
//! This module handles the server-side bookkeeping for connected clients:
//! - Session lifecycle (register on accept, unregister on disconnect)
//! - The one-to-one connection-to-player binding created by a join
//! - Outbound message routing (per-connection sends and whole-server
//!   broadcasts)
//! - Sanitization of client-supplied profile fields
//!
//! Sessions are owned by the game-loop task together with the world, so all
//! mutations here happen between simulation steps and a tick never observes
//! a half-applied join or leave.

use log::{debug, error, info};
use shared::{ServerMessage, MAX_AVATAR_LEN, MAX_NAME_LEN};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Display name used when a client joins without a usable name.
pub const DEFAULT_NAME: &str = "Player";

/// A single client connection and its binding state.
///
/// A session starts unbound; a successful join binds it to a player id for
/// the rest of its life. There is no rebind: disconnecting and joining again
/// produces a brand-new player.
#[derive(Debug)]
pub struct Session {
    /// Unique connection identifier assigned by the acceptor.
    pub conn_id: u64,
    /// Outbound queue drained by the connection's writer task.
    pub sender: mpsc::UnboundedSender<Message>,
    /// Player bound to this connection, if it has joined.
    pub player_id: Option<String>,
}

/// Tracks all live connections and their player bindings.
///
/// The manager is the broadcast fan-out point: every registered connection,
/// joined or not, receives the per-tick snapshot.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<u64, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Registers a freshly accepted connection in the unbound state.
    pub fn register(&mut self, conn_id: u64, sender: mpsc::UnboundedSender<Message>) {
        info!("Connection {} registered", conn_id);
        self.sessions.insert(
            conn_id,
            Session {
                conn_id,
                sender,
                player_id: None,
            },
        );
    }

    /// Binds a connection to a player id after a join. Returns false if the
    /// connection is unknown or already bound; the caller treats that as a
    /// duplicate join and ignores it.
    pub fn bind(&mut self, conn_id: u64, player_id: String) -> bool {
        match self.sessions.get_mut(&conn_id) {
            Some(session) if session.player_id.is_none() => {
                info!("Connection {} bound to player {}", conn_id, player_id);
                session.player_id = Some(player_id);
                true
            }
            _ => false,
        }
    }

    /// Looks up the player bound to a connection. `None` means the
    /// connection has not joined yet.
    pub fn player_id(&self, conn_id: u64) -> Option<&str> {
        self.sessions
            .get(&conn_id)
            .and_then(|session| session.player_id.as_deref())
    }

    /// Removes a connection and returns the player id it was bound to, if
    /// any. Idempotent: a second call for the same connection is a no-op
    /// returning `None`.
    pub fn unregister(&mut self, conn_id: u64) -> Option<String> {
        let session = self.sessions.remove(&conn_id)?;
        info!("Connection {} unregistered", conn_id);
        session.player_id
    }

    /// Sends a message to a single connection. Failures mean the connection
    /// is already closing; its disconnect event performs the cleanup.
    pub fn send_to(&self, conn_id: u64, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize message: {}", e);
                return;
            }
        };

        if let Some(session) = self.sessions.get(&conn_id) {
            if session.sender.send(Message::Text(text)).is_err() {
                debug!("Dropped send to closing connection {}", conn_id);
            }
        }
    }

    /// Sends the same message to every registered connection. The payload is
    /// serialized once and shared across the whole pass.
    pub fn broadcast(&self, message: &ServerMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        for session in self.sessions.values() {
            if session.sender.send(Message::Text(text.clone())).is_err() {
                debug!("Dropped broadcast to closing connection {}", session.conn_id);
            }
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Clamps a requested display name to the length limit, substituting a
/// placeholder for a missing, non-string, or empty name.
pub fn sanitize_name(name: Option<String>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_LEN).collect(),
        _ => DEFAULT_NAME.to_string(),
    }
}

/// Clamps a requested avatar reference to the length limit. The contents
/// are opaque to the server and never interpreted.
pub fn sanitize_avatar(avatar: Option<String>) -> String {
    avatar
        .map(|avatar| avatar.chars().take(MAX_AVATAR_LEN).collect())
        .unwrap_or_default()
}

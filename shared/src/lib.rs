//! Wire protocol shared between the game server and its clients.
//!
//! Messages are JSON objects tagged by a `"type"` field and travel as text
//! frames over a persistent WebSocket connection. The protocol is lenient on
//! purpose: fields with the wrong JSON type coerce to a safe default instead
//! of failing the whole message, while an unknown `"type"` or unparseable
//! payload fails deserialization and is dropped by the caller without any
//! error frame going back to the client.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Maximum length of a player display name, in characters.
pub const MAX_NAME_LEN: usize = 20;
/// Maximum length of an avatar reference, in characters. The server never
/// interprets the contents.
pub const MAX_AVATAR_LEN: usize = 400;

/// Messages a client may send to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Requests a player entity bound to this connection.
    Join {
        #[serde(default, deserialize_with = "string_or_none")]
        name: Option<String>,
        #[serde(default, deserialize_with = "string_or_none")]
        avatar: Option<String>,
    },
    /// Latest movement intent. Values outside [-1, 1] are clamped at
    /// ingestion; non-numeric values coerce to 0 here.
    Input {
        #[serde(default, deserialize_with = "number_or_zero")]
        dx: f32,
        #[serde(default, deserialize_with = "number_or_zero")]
        dy: f32,
    },
}

/// Messages the server sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Greeting sent immediately after the connection is accepted.
    Hello { msg: String },
    /// Response to a valid join carrying the new player id.
    Joined { id: String },
    /// Per-tick world snapshot, identical for every connection.
    State {
        /// Wall-clock timestamp in milliseconds.
        t: u64,
        world: WorldDims,
        players: Vec<PlayerView>,
        foods: Vec<FoodView>,
    },
}

/// World extent; the playfield is centered on the origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldDims {
    pub w: f32,
    pub h: f32,
}

/// Public view of a player. Velocity and intent stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
    pub xp: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

/// Accepts any JSON value, keeping it only if it is a string.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Accepts any JSON value, coercing anything that is not a number to 0.
fn number_or_zero<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|n| n as f32).unwrap_or(0.0))
}

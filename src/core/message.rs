//! Wire message types for the presence protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One roster entry as seen by other clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub zone: String,
    pub payload: Value,
}

/// Client-to-server message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Update own position. Coordinates stay raw JSON so a missing or
    /// malformed field reaches the engine's validation instead of being
    /// dropped as a parse failure.
    #[serde(rename = "move")]
    Move {
        #[serde(default)]
        x: Value,
        #[serde(default)]
        y: Value,
    },

    /// Relay a chat line to the room
    #[serde(rename = "chat")]
    Chat { content: String },

    /// Liveness probe
    #[serde(rename = "ping")]
    Ping,
}

/// Server-to-client message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full roster sent once to a session when its join succeeds
    #[serde(rename = "snapshot")]
    Snapshot {
        room: String,
        players: Vec<PlayerView>,
        timestamp: DateTime<Utc>,
    },

    /// Another session joined the room
    #[serde(rename = "player_joined")]
    PlayerJoined { player: PlayerView },

    /// Another session left the room
    #[serde(rename = "player_left")]
    PlayerLeft { id: String },

    /// Another session moved
    #[serde(rename = "player_moved")]
    PlayerMoved { id: String, x: f64, y: f64 },

    /// Chat line from another session
    #[serde(rename = "chat")]
    Chat {
        sender: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Reply to a ping
    #[serde(rename = "pong")]
    Pong,

    /// Rejection or failure notice for the receiving session only
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn snapshot(room: String, players: Vec<PlayerView>) -> Self {
        Self::Snapshot {
            room,
            players,
            timestamp: Utc::now(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

//! Session model: one connected client's transient presence record

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::connection::Connection;
use crate::core::message::PlayerView;

/// Last known location of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// Lifecycle of a connection as the engine sees it.
/// Left is terminal; messages referencing a Left session are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Registered,
    Left,
}

/// A registered session's record inside a room.
/// Position is mutated only by that session's own move events; the display
/// payload is set once at join and only ever replaced wholesale.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub position: Position,
    pub zone: String,
    pub display_payload: Value,
    pub connection: Connection,
    pub joined_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, zone: String, display_payload: Value, connection: Connection) -> Self {
        Self {
            id,
            position: Position::origin(),
            zone,
            display_payload,
            connection,
            joined_at: Utc::now(),
        }
    }

    /// Roster entry for snapshots and join deltas
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            x: self.position.x,
            y: self.position.y,
            zone: self.zone.clone(),
            payload: self.display_payload.clone(),
        }
    }
}

/// Per-connection presence state owned by the transport handler and
/// driven through the engine. The id stays unset until a join succeeds,
/// and a session without an id never reaches any roster or broadcast.
#[derive(Debug)]
pub struct ClientSession {
    pub state: SessionState,
    pub external_id: Option<String>,
    pub room: Option<String>,
    pub connection: Connection,
}

impl ClientSession {
    pub fn new(connection: Connection) -> Self {
        Self {
            state: SessionState::Connecting,
            external_id: None,
            room: None,
            connection,
        }
    }

    /// Bind identity and room once the registry accepted the join
    pub fn register(&mut self, external_id: String, room: String) {
        self.external_id = Some(external_id);
        self.room = Some(room);
        self.state = SessionState::Registered;
    }

    /// Terminal transition; no further mutation is permitted
    pub fn mark_left(&mut self) {
        self.state = SessionState::Left;
    }

    pub fn is_registered(&self) -> bool {
        self.state == SessionState::Registered
    }
}

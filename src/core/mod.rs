//! Core functionality for the presence server

pub mod connection;
pub mod engine;
pub mod fanout;
pub mod message;
pub mod room;
pub mod session;

// Re-export main components for convenience
pub use connection::Connection;
pub use engine::PresenceEngine;
pub use message::{ClientMessage, PlayerView, ServerMessage};
pub use room::{Room, RoomRegistry};
pub use session::{ClientSession, Session, SessionState};

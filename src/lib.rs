//! Roomcast - a realtime multiplayer presence server
//!
//! Clients connect over WebSocket to a named room; the engine keeps every
//! connected client's transient state (position, zone, display payload)
//! synchronized with every other client in the same room.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;

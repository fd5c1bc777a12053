//! Request handlers for WebSocket and HTTP endpoints

pub mod rooms;
pub mod websocket;

//! WebSocket connection handle
//! The transport task owns the socket; everything else holds this sender

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

/// Outbound handle for a single client connection
#[derive(Debug, Clone)]
pub struct Connection {
    /// Transport-level id, assigned before the client has an identity
    pub conn_id: String,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            conn_id: Uuid::new_v4().to_string(),
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a text frame through this connection
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.send(Message::text(text)) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to connection {}", self.conn_id);
                false
            }
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

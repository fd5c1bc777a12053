//! Broadcast fan-out: best-effort delivery to a precomputed recipient set
//!
//! Recipient sets are computed inside the room's critical section; delivery
//! happens here, after the lock is released, so a slow client never stalls
//! room mutation.

use log::{debug, warn};

use crate::core::connection::Connection;
use crate::core::message::ServerMessage;

/// One delivery target: session id plus its outbound handle
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: String,
    pub connection: Connection,
}

/// Deliver a message to every recipient. A failed send (closed or broken
/// connection) is logged and skipped; it never aborts the loop. Returns the
/// number of successful deliveries.
pub fn deliver(recipients: &[Recipient], message: &ServerMessage) -> usize {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize outbound message: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for recipient in recipients {
        if recipient.connection.send_text(&text) {
            delivered += 1;
        } else {
            debug!("Dropped delivery to disconnected session {}", recipient.id);
        }
    }

    delivered
}

/// Deliver a notice to a single connection
pub fn notify(connection: &Connection, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => connection.send_text(&text),
        Err(e) => {
            warn!("Failed to serialize notice: {}", e);
            false
        }
    }
}

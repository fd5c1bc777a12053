use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info};
use std::collections::HashMap;
use tokio::sync::mpsc;
use warp::ws::WebSocket;

use crate::constants::DEFAULT_ZONE;
use crate::core::connection::Connection;
use crate::core::engine::SharedEngine;
use crate::core::session::ClientSession;

/// Connection parameters taken from the upgrade request's query string
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub room: String,
    pub id: String,
    pub zone: String,
}

impl ConnectParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            room: query.get("room").cloned().unwrap_or_else(|| "lobby".to_string()),
            id: query.get("id").cloned().unwrap_or_default(),
            zone: query
                .get("zone")
                .cloned()
                .unwrap_or_else(|| DEFAULT_ZONE.to_string()),
        }
    }
}

// Handle a WebSocket connection for its whole lifetime
pub async fn handle_ws_client(ws: WebSocket, engine: SharedEngine, params: ConnectParams) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Forward messages from our channel to the WebSocket. The task drains
    // the channel after the handler returns, so a rejection notice queued
    // just before termination still reaches the client.
    tokio::task::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let connection = Connection::new(tx);
    let mut session = ClientSession::new(connection);

    // Join the requested room; a rejection terminates the connection after
    // the error notice has been queued
    if let Err(e) = engine
        .connect(&mut session, &params.room, &params.id, &params.zone)
        .await
    {
        info!("Connection rejected for room '{}': {}", params.room, e);
        return;
    }

    info!(
        "Current sessions: {}",
        engine.registry().session_count().await
    );

    // Handle incoming messages until the client goes away
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if let Ok(text) = msg.to_str() {
                    engine.handle_message(&mut session, text).await;
                } else if msg.is_close() {
                    break;
                }
                // binary and control frames are not part of the protocol
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    engine.disconnect(&mut session).await;
    info!(
        "Current sessions: {}",
        engine.registry().session_count().await
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_room_and_zone() {
        let params = ConnectParams::from_query(&HashMap::new());
        assert_eq!(params.room, "lobby");
        assert_eq!(params.zone, DEFAULT_ZONE);
        assert!(params.id.is_empty());
    }

    #[test]
    fn test_params_from_query() {
        let mut query = HashMap::new();
        query.insert("room".to_string(), "alpha".to_string());
        query.insert("id".to_string(), "p1".to_string());
        query.insert("zone".to_string(), "cave".to_string());

        let params = ConnectParams::from_query(&query);
        assert_eq!(params.room, "alpha");
        assert_eq!(params.id, "p1");
        assert_eq!(params.zone, "cave");
    }
}

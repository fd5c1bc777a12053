//! Presence engine: orchestrates join, move, chat and leave against the
//! room registry and decides snapshot versus delta delivery.
//!
//! The engine never holds a room lock while sending: the registry returns
//! the recipient set computed inside its critical section and delivery runs
//! through the fan-out afterwards.

use chrono::Utc;
use log::{debug, info, warn};

use crate::core::fanout;
use crate::core::message::{ClientMessage, ServerMessage};
use crate::core::room::RoomRegistry;
use crate::core::session::{ClientSession, Session, SessionState};
use crate::error::{Result, RoomcastError};
use crate::storage::traits::default_payload;
use crate::storage::SharedProfileStore;

pub struct PresenceEngine {
    registry: RoomRegistry,
    profiles: SharedProfileStore,
}

/// Shared reference to the presence engine
pub type SharedEngine = std::sync::Arc<PresenceEngine>;

impl PresenceEngine {
    pub fn new(registry: RoomRegistry, profiles: SharedProfileStore) -> Self {
        Self { registry, profiles }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Drive a fresh connection through the join algorithm.
    ///
    /// On success the session is Registered, the joiner has received its
    /// full self-inclusive snapshot, and everyone else in the room has
    /// received exactly one join delta. On rejection the session stays
    /// Connecting and only the joiner is notified; the caller decides
    /// whether to terminate the connection.
    pub async fn connect(
        &self,
        session: &mut ClientSession,
        room: &str,
        external_id: &str,
        zone: &str,
    ) -> Result<()> {
        if session.state == SessionState::Left {
            debug!("Ignoring connect on a session that already left");
            return Err(RoomcastError::ConnectionClosed);
        }

        let external_id = external_id.trim();
        if external_id.is_empty() {
            let err = RoomcastError::MissingIdentity;
            fanout::notify(
                &session.connection,
                &ServerMessage::error(err.code(), err.to_string()),
            );
            return Err(err);
        }

        let payload = match self.profiles.fetch_profile(external_id).await {
            Ok(Some(payload)) => payload,
            Ok(None) => default_payload(),
            Err(e) => {
                warn!("Profile lookup failed for '{}': {}", external_id, e);
                default_payload()
            }
        };

        let record = Session::new(
            external_id.to_string(),
            zone.to_string(),
            payload,
            session.connection.clone(),
        );

        match self.registry.join(room, record).await {
            Ok(outcome) => {
                session.register(external_id.to_string(), room.to_string());

                // The joiner's snapshot goes out before the delta dispatch.
                fanout::notify(
                    &session.connection,
                    &ServerMessage::snapshot(outcome.room, outcome.snapshot),
                );
                let delivered = fanout::deliver(
                    &outcome.peers,
                    &ServerMessage::PlayerJoined {
                        player: outcome.player,
                    },
                );

                info!(
                    "Session '{}' joined room '{}' ({} peers notified)",
                    external_id, room, delivered
                );
                Ok(())
            }
            Err(RoomcastError::AlreadyJoined(id)) => {
                // A retried join for the same room converges without a
                // re-announcement. The same id in a different room is a
                // genuine conflict.
                if self.registry.room_of(&id).await.as_deref() == Some(room) {
                    // The retrying socket becomes the delivery target for
                    // future deltas; the old transport is superseded.
                    match self
                        .registry
                        .refresh_connection(room, &id, session.connection.clone())
                        .await
                    {
                        Ok(snapshot) => {
                            session.register(id, room.to_string());
                            fanout::notify(
                                &session.connection,
                                &ServerMessage::snapshot(room.to_string(), snapshot),
                            );
                            debug!("Idempotent rejoin for '{}' in room '{}'", external_id, room);
                            Ok(())
                        }
                        Err(err) => {
                            fanout::notify(
                                &session.connection,
                                &ServerMessage::error(err.code(), err.to_string()),
                            );
                            Err(err)
                        }
                    }
                } else {
                    let err = RoomcastError::AlreadyJoined(id);
                    fanout::notify(
                        &session.connection,
                        &ServerMessage::error(err.code(), err.to_string()),
                    );
                    Err(err)
                }
            }
            Err(err) => {
                fanout::notify(
                    &session.connection,
                    &ServerMessage::error(err.code(), err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Process one inbound text frame from a connected client.
    /// Unrecognized or unparseable messages are logged and dropped.
    pub async fn handle_message(&self, session: &mut ClientSession, text: &str) {
        if !session.is_registered() {
            debug!(
                "Ignoring message from session in state {:?} (stale reference)",
                session.state
            );
            return;
        }

        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Unrecognized client message, ignoring: {}", e);
                return;
            }
        };

        match message {
            ClientMessage::Move { x, y } => self.handle_move(session, x, y).await,
            ClientMessage::Chat { content } => self.handle_chat(session, content).await,
            ClientMessage::Ping => {
                fanout::notify(&session.connection, &ServerMessage::Pong);
            }
        }
    }

    /// Tear the session down: remove it from its room and notify the
    /// remaining members. Safe to call for sessions that never registered.
    pub async fn disconnect(&self, session: &mut ClientSession) {
        if session.state == SessionState::Left {
            debug!("Duplicate disconnect, ignoring");
            return;
        }

        if let (Some(id), Some(room)) = (session.external_id.clone(), session.room.clone()) {
            let conn_id = session.connection.conn_id.clone();
            match self.registry.leave(&room, &id, Some(&conn_id)).await {
                Ok(outcome) => {
                    fanout::deliver(&outcome.peers, &ServerMessage::PlayerLeft { id: id.clone() });
                    info!("Session '{}' left room '{}'", id, room);
                }
                Err(RoomcastError::SessionNotFound(_)) | Err(RoomcastError::RoomNotFound(_)) => {
                    debug!("Session '{}' was not registered in '{}' at disconnect", id, room);
                }
                Err(e) => warn!("Failed to remove session '{}' from '{}': {}", id, room, e),
            }
        } else {
            debug!("Disconnect before registration, nothing to release");
        }

        session.mark_left();
    }

    async fn handle_move(&self, session: &ClientSession, x: serde_json::Value, y: serde_json::Value) {
        let (x, y) = match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => (x, y),
            _ => {
                let err = RoomcastError::ValidationError(
                    "move coordinates must be finite numbers".to_string(),
                );
                fanout::notify(
                    &session.connection,
                    &ServerMessage::error(err.code(), err.to_string()),
                );
                return;
            }
        };

        let (id, room) = match (&session.external_id, &session.room) {
            (Some(id), Some(room)) => (id.clone(), room.clone()),
            _ => return,
        };

        match self.registry.update_position(&room, &id, x, y).await {
            Ok(outcome) => {
                fanout::deliver(
                    &outcome.peers,
                    &ServerMessage::PlayerMoved {
                        id,
                        x: outcome.position.x,
                        y: outcome.position.y,
                    },
                );
            }
            Err(e) => debug!("Move from '{}' dropped: {}", id, e),
        }
    }

    async fn handle_chat(&self, session: &ClientSession, content: String) {
        let (id, room) = match (&session.external_id, &session.room) {
            (Some(id), Some(room)) => (id.clone(), room.clone()),
            _ => return,
        };

        let peers = self.registry.peers(&room, Some(&id)).await;
        fanout::deliver(
            &peers,
            &ServerMessage::Chat {
                sender: id,
                content,
                timestamp: Utc::now(),
            },
        );
    }
}

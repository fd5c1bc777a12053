//! Rooms and the registry that owns per-room membership
//!
//! The registry is the only mutator of room membership. Every operation is
//! one complete critical section under that room's lock; operations on
//! different rooms run in parallel. Recipient sets and snapshots are
//! computed inside the lock and handed back so delivery happens outside.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::core::connection::Connection;
use crate::core::fanout::Recipient;
use crate::core::message::PlayerView;
use crate::core::session::{Position, Session};
use crate::error::{Result, RoomcastError};

/// A logical grouping of sessions that receive each other's presence updates
#[derive(Debug)]
pub struct Room {
    pub name: String,
    /// Maximum number of sessions allowed (None for unlimited)
    pub capacity: Option<usize>,
    /// Registered sessions keyed by external id
    sessions: HashMap<String, Session>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Set when the registry drops this room; a joiner that raced the
    /// reclaim re-fetches the room instead of inserting into the orphan
    reclaimed: bool,
}

impl Room {
    pub fn new(name: String, capacity: Option<usize>) -> Self {
        Self {
            name,
            capacity,
            sessions: HashMap::new(),
            created_at: chrono::Utc::now(),
            reclaimed: false,
        }
    }

    pub fn member_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn has_member(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    fn is_full(&self) -> bool {
        self.capacity
            .map(|max| self.sessions.len() >= max)
            .unwrap_or(false)
    }

    /// Current roster, one view per registered session
    fn roster(&self) -> Vec<PlayerView> {
        self.sessions.values().map(Session::view).collect()
    }

    /// Delivery targets, optionally excluding one session
    fn recipients(&self, exclude: Option<&str>) -> Vec<Recipient> {
        self.sessions
            .values()
            .filter(|s| exclude != Some(s.id.as_str()))
            .map(|s| Recipient {
                id: s.id.clone(),
                connection: s.connection.clone(),
            })
            .collect()
    }
}

/// Result of a successful join: the joiner's self-inclusive snapshot and
/// the peers that must receive the join delta, both taken at the moment of
/// insertion.
#[derive(Debug)]
pub struct JoinOutcome {
    pub room: String,
    pub player: PlayerView,
    pub snapshot: Vec<PlayerView>,
    pub peers: Vec<Recipient>,
}

/// Result of a successful leave: the removed session and the remaining
/// peers that must receive the leave delta.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub session: Session,
    pub peers: Vec<Recipient>,
}

/// Result of a successful move: the stored position and the peers that
/// must receive the move delta.
#[derive(Debug)]
pub struct MoveOutcome {
    pub position: Position,
    pub peers: Vec<Recipient>,
}

/// Owns all rooms and the system-wide session index.
///
/// The index enforces that a session id is in at most one room at a time.
/// A join never waits on a room lock while holding the index lock: it
/// reserves its id in a scoped index section first and rolls the
/// reservation back if the room rejects it, so operations on different
/// rooms run in parallel.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    /// session id -> room name, across all rooms
    session_index: Mutex<HashMap<String, String>>,
    default_capacity: Option<usize>,
}

impl RoomRegistry {
    pub fn new(default_capacity: Option<usize>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            session_index: Mutex::new(HashMap::new()),
            default_capacity,
        }
    }

    /// Adds a session to a room, creating the room lazily.
    ///
    /// Fails with AlreadyJoined if the id is registered anywhere, and with
    /// RoomFull if the room is at capacity; neither failure mutates state.
    pub async fn join(&self, room_name: &str, session: Session) -> Result<JoinOutcome> {
        // Reserve the id before touching any room so the same session can
        // never enter two rooms at once
        {
            let mut index = self.session_index.lock().await;
            if index.contains_key(&session.id) {
                return Err(RoomcastError::AlreadyJoined(session.id));
            }
            index.insert(session.id.clone(), room_name.to_string());
        }

        // Re-fetch if the room was reclaimed between lookup and lock
        let mut room = loop {
            let room_arc = self.room_or_create(room_name).await;
            let guard = room_arc.lock_owned().await;
            if !guard.reclaimed {
                break guard;
            }
        };

        if room.is_full() {
            let empty = room.sessions.is_empty();
            drop(room);
            self.session_index.lock().await.remove(&session.id);
            if empty {
                // Zero-capacity room created by this very call
                self.reclaim_if_empty(room_name).await;
            }
            return Err(RoomcastError::RoomFull);
        }

        let player = session.view();
        let peers = room.recipients(Some(&session.id));
        room.sessions.insert(session.id.clone(), session);

        // Snapshot reflects the registry state after the insert, so the
        // joiner always sees itself.
        let snapshot = room.roster();

        Ok(JoinOutcome {
            room: room_name.to_string(),
            player,
            snapshot,
            peers,
        })
    }

    /// Removes a session from a room. A duplicate leave (or a leave for a
    /// session that never registered) returns SessionNotFound, which
    /// callers treat as a benign no-op.
    ///
    /// When `conn_id` is given, the stored session is only removed if it
    /// still belongs to that transport: a disconnect from a superseded
    /// socket must not evict the session a rejoin installed.
    pub async fn leave(
        &self,
        room_name: &str,
        session_id: &str,
        conn_id: Option<&str>,
    ) -> Result<LeaveOutcome> {
        let room_arc = self
            .lookup(room_name)
            .await
            .ok_or_else(|| RoomcastError::RoomNotFound(room_name.to_string()))?;
        let mut room = room_arc.lock().await;

        match room.sessions.get(session_id) {
            Some(stored) => {
                if let Some(conn_id) = conn_id {
                    if stored.connection.conn_id != conn_id {
                        return Err(RoomcastError::SessionNotFound(session_id.to_string()));
                    }
                }
            }
            None => return Err(RoomcastError::SessionNotFound(session_id.to_string())),
        }

        let session = room
            .sessions
            .remove(session_id)
            .ok_or_else(|| RoomcastError::SessionNotFound(session_id.to_string()))?;
        // Index entry goes while the room lock is held so membership and
        // index never disagree
        self.session_index.lock().await.remove(session_id);

        let peers = room.recipients(None);
        let now_empty = room.sessions.is_empty();
        drop(room);

        if now_empty {
            self.reclaim_if_empty(room_name).await;
        }

        Ok(LeaveOutcome { session, peers })
    }

    /// Swap a registered session's transport in place and return the
    /// current roster. Used when a client retries a join for a room it is
    /// already in: the new socket must become the delivery target for
    /// future deltas.
    pub async fn refresh_connection(
        &self,
        room_name: &str,
        session_id: &str,
        connection: Connection,
    ) -> Result<Vec<PlayerView>> {
        let room_arc = self
            .lookup(room_name)
            .await
            .ok_or_else(|| RoomcastError::RoomNotFound(room_name.to_string()))?;
        let mut room = room_arc.lock().await;

        let session = room
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RoomcastError::SessionNotFound(session_id.to_string()))?;
        session.connection = connection;

        Ok(room.roster())
    }

    /// Mutates a session's position in place; membership is unaffected
    pub async fn update_position(
        &self,
        room_name: &str,
        session_id: &str,
        x: f64,
        y: f64,
    ) -> Result<MoveOutcome> {
        let room_arc = self
            .lookup(room_name)
            .await
            .ok_or_else(|| RoomcastError::RoomNotFound(room_name.to_string()))?;
        let mut room = room_arc.lock().await;

        let session = room
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RoomcastError::SessionNotFound(session_id.to_string()))?;
        session.position = Position { x, y };
        let position = session.position;

        let peers = room.recipients(Some(session_id));
        Ok(MoveOutcome { position, peers })
    }

    /// Delivery targets in a room, optionally excluding one session
    pub async fn peers(&self, room_name: &str, exclude: Option<&str>) -> Vec<Recipient> {
        match self.lookup(room_name).await {
            Some(room_arc) => room_arc.lock().await.recipients(exclude),
            None => Vec::new(),
        }
    }

    /// The room a session id is currently registered in, if any
    pub async fn room_of(&self, session_id: &str) -> Option<String> {
        self.session_index.lock().await.get(session_id).cloned()
    }

    /// Read-only roster view; an unknown room reads as empty
    pub async fn snapshot(&self, room_name: &str) -> Vec<PlayerView> {
        match self.lookup(room_name).await {
            Some(room_arc) => room_arc.lock().await.roster(),
            None => Vec::new(),
        }
    }

    /// Room names with current occupancy
    pub async fn list_rooms(&self) -> Vec<(String, usize)> {
        let rooms = self.rooms.read().await;
        let mut listing = Vec::with_capacity(rooms.len());
        for (name, room_arc) in rooms.iter() {
            let room = room_arc.lock().await;
            listing.push((name.clone(), room.member_count()));
        }
        listing
    }

    /// Total registered sessions across all rooms
    pub async fn session_count(&self) -> usize {
        self.session_index.lock().await.len()
    }

    async fn lookup(&self, room_name: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_name).cloned()
    }

    /// Fetch a room, creating it lazily on first reference
    async fn room_or_create(&self, room_name: &str) -> Arc<Mutex<Room>> {
        if let Some(room) = self.lookup(room_name).await {
            return room;
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_name.to_string())
            .or_insert_with(|| {
                log::debug!("Creating room '{}'", room_name);
                Arc::new(Mutex::new(Room::new(
                    room_name.to_string(),
                    self.default_capacity,
                )))
            })
            .clone()
    }

    /// Drop a room once its last session is gone. The reclaimed flag makes
    /// a join that already fetched the Arc re-fetch the map entry instead
    /// of inserting into the orphan.
    async fn reclaim_if_empty(&self, room_name: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(room_arc) = rooms.get(room_name) {
            let mut room = room_arc.lock().await;
            if room.sessions.is_empty() {
                log::debug!("Reclaiming empty room '{}'", room_name);
                room.reclaimed = true;
                drop(room);
                rooms.remove(room_name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::Connection;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Duration};

    fn session(id: &str) -> Session {
        let (tx, _rx) = mpsc::unbounded_channel();
        Session::new(
            id.to_string(),
            "spawn".to_string(),
            serde_json::Value::Null,
            Connection::new(tx),
        )
    }

    #[tokio::test]
    async fn test_join_returns_self_inclusive_snapshot() {
        let registry = RoomRegistry::new(None);
        let outcome = registry.join("alpha", session("p1")).await.unwrap();

        assert_eq!(outcome.snapshot.len(), 1);
        assert_eq!(outcome.snapshot[0].id, "p1");
        assert!(outcome.peers.is_empty());
    }

    #[tokio::test]
    async fn test_second_join_sees_both_and_one_peer() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();
        let outcome = registry.join("alpha", session("p2")).await.unwrap();

        let mut ids: Vec<&str> = outcome.snapshot.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(outcome.peers.len(), 1);
        assert_eq!(outcome.peers[0].id, "p1");
    }

    #[tokio::test]
    async fn test_capacity_rejects_join_without_mutation() {
        let registry = RoomRegistry::new(Some(1));
        registry.join("alpha", session("p1")).await.unwrap();

        let result = registry.join("alpha", session("p2")).await;
        assert!(matches!(result, Err(RoomcastError::RoomFull)));
        assert_eq!(registry.snapshot("alpha").await.len(), 1);
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_session_id_unique_across_rooms() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();

        let result = registry.join("beta", session("p1")).await;
        assert!(matches!(result, Err(RoomcastError::AlreadyJoined(_))));
        assert!(registry.snapshot("beta").await.is_empty());
    }

    #[tokio::test]
    async fn test_leave_then_rejoin_other_room() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();
        registry.leave("alpha", "p1", None).await.unwrap();

        assert!(registry.join("beta", session("p1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_leave_is_not_found() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();

        assert!(registry.leave("alpha", "p1", None).await.is_ok());
        let second = registry.leave("alpha", "p1", None).await;
        assert!(matches!(second, Err(RoomcastError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_position_mutates_in_place() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();

        let outcome = registry.update_position("alpha", "p1", 5.0, 7.0).await.unwrap();
        assert_eq!(outcome.position, Position { x: 5.0, y: 7.0 });

        let snapshot = registry.snapshot("alpha").await;
        assert_eq!(snapshot[0].x, 5.0);
        assert_eq!(snapshot[0].y, 7.0);
    }

    #[tokio::test]
    async fn test_move_on_unknown_session_is_not_found() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();

        let result = registry.update_position("alpha", "ghost", 1.0, 1.0).await;
        assert!(matches!(result, Err(RoomcastError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_room_is_reclaimed() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();
        assert_eq!(registry.list_rooms().await.len(), 1);

        registry.leave("alpha", "p1", None).await.unwrap();
        assert!(registry.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_connection_swaps_delivery_target() {
        let registry = RoomRegistry::new(None);
        registry.join("alpha", session("p1")).await.unwrap();
        registry.join("alpha", session("p2")).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let replacement = Connection::new(tx);
        let roster = registry
            .refresh_connection("alpha", "p1", replacement)
            .await
            .unwrap();
        assert_eq!(roster.len(), 2);

        // Deltas aimed at p1 now land on the replacement channel
        for peer in registry.peers("alpha", Some("p2")).await {
            assert!(peer.connection.send_text("delta"));
        }
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_leave_with_stale_conn_id_keeps_session() {
        let registry = RoomRegistry::new(None);
        let original = session("p1");
        let stale_conn = original.connection.conn_id.clone();
        registry.join("alpha", original).await.unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        registry
            .refresh_connection("alpha", "p1", Connection::new(tx))
            .await
            .unwrap();

        let result = registry.leave("alpha", "p1", Some(&stale_conn)).await;
        assert!(matches!(result, Err(RoomcastError::SessionNotFound(_))));
        assert_eq!(registry.snapshot("alpha").await.len(), 1);
        assert_eq!(registry.room_of("p1").await.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_concurrent_join_leave_keeps_index_consistent() {
        let registry = Arc::new(RoomRegistry::new(None));
        let success = Arc::new(AtomicBool::new(true));

        let mut handles = vec![];
        for i in 0..16 {
            let registry = registry.clone();
            let success = success.clone();
            let id = format!("p{}", i);
            let room = if i % 2 == 0 { "alpha" } else { "beta" };

            handles.push(tokio::spawn(async move {
                match registry.join(room, session(&id)).await {
                    Ok(_) => {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        if registry.leave(room, &id, None).await.is_err() {
                            success.store(false, Ordering::Relaxed);
                        }
                    }
                    Err(_) => success.store(false, Ordering::Relaxed),
                }
            }));
        }

        for handle in handles {
            let _ = timeout(Duration::from_secs(5), handle).await;
        }

        assert!(success.load(Ordering::Relaxed));
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.snapshot("alpha").await.is_empty());
        assert!(registry.snapshot("beta").await.is_empty());
    }
}

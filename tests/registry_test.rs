use roomcast::core::connection::Connection;
use roomcast::core::room::RoomRegistry;
use roomcast::core::session::Session;
use tokio::sync::mpsc;

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
async fn test_membership_matches_snapshot() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("alpha", session("p2")).await.unwrap();
    registry.join("alpha", session("p3")).await.unwrap();
    registry.leave("alpha", "p2", None).await.unwrap();

    let mut ids: Vec<String> = registry
        .snapshot("alpha")
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(registry.session_count().await, 2);
}

#[tokio::test]
async fn test_departed_session_never_reappears() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("alpha", session("p2")).await.unwrap();
    registry.leave("alpha", "p1", None).await.unwrap();

    // Neither the snapshot nor the recipient set references p1
    let snapshot = registry.snapshot("alpha").await;
    assert!(snapshot.iter().all(|p| p.id != "p1"));
    let peers = registry.peers("alpha", None).await;
    assert!(peers.iter().all(|r| r.id != "p1"));

    // Moving the departed session is rejected and mutates nothing
    assert!(registry.update_position("alpha", "p1", 1.0, 1.0).await.is_err());
    assert_eq!(registry.snapshot("alpha").await.len(), 1);
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("beta", session("p2")).await.unwrap();

    let alpha = registry.snapshot("alpha").await;
    assert_eq!(alpha.len(), 1);
    assert_eq!(alpha[0].id, "p1");

    // A join in alpha has no recipients in beta
    let outcome = registry.join("alpha", session("p3")).await.unwrap();
    assert_eq!(outcome.peers.len(), 1);
    assert_eq!(outcome.peers[0].id, "p1");
}

#[tokio::test]
async fn test_peers_excludes_requested_session() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("alpha", session("p2")).await.unwrap();

    let peers = registry.peers("alpha", Some("p1")).await;
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].id, "p2");
}

#[tokio::test]
async fn test_room_of_tracks_current_room() {
    let registry = RoomRegistry::new(None);

    assert_eq!(registry.room_of("p1").await, None);
    registry.join("alpha", session("p1")).await.unwrap();
    assert_eq!(registry.room_of("p1").await.as_deref(), Some("alpha"));

    registry.leave("alpha", "p1", None).await.unwrap();
    assert_eq!(registry.room_of("p1").await, None);
}

#[tokio::test]
async fn test_list_rooms_reports_occupancy() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("alpha", session("p2")).await.unwrap();
    registry.join("beta", session("p3")).await.unwrap();

    let mut listing = registry.list_rooms().await;
    listing.sort();
    assert_eq!(
        listing,
        vec![("alpha".to_string(), 2), ("beta".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_capacity_applies_per_room() {
    let registry = RoomRegistry::new(Some(2));

    registry.join("alpha", session("p1")).await.unwrap();
    registry.join("alpha", session("p2")).await.unwrap();
    assert!(registry.join("alpha", session("p3")).await.is_err());

    // A different room still has space
    assert!(registry.join("beta", session("p3")).await.is_ok());
}

#[tokio::test]
async fn test_join_outcome_snapshot_taken_at_insertion() {
    let registry = RoomRegistry::new(None);

    registry.join("alpha", session("p1")).await.unwrap();
    let outcome = registry.join("alpha", session("p2")).await.unwrap();

    // The joiner appears in its own snapshot exactly once
    let self_entries = outcome.snapshot.iter().filter(|p| p.id == "p2").count();
    assert_eq!(self_entries, 1);
    // And never in its own peer set
    assert!(outcome.peers.iter().all(|r| r.id != "p2"));
}

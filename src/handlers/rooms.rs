//! HTTP endpoints for room occupancy

use serde::Serialize;

use crate::core::engine::SharedEngine;

/// One entry in the room listing response
#[derive(Debug, Serialize)]
pub struct RoomInfo {
    pub name: String,
    pub occupancy: usize,
}

/// Reply for `GET /rooms`: every live room with its current occupancy
pub async fn list_rooms(engine: SharedEngine) -> impl warp::Reply {
    let mut rooms: Vec<RoomInfo> = engine
        .registry()
        .list_rooms()
        .await
        .into_iter()
        .map(|(name, occupancy)| RoomInfo { name, occupancy })
        .collect();
    rooms.sort_by(|a, b| a.name.cmp(&b.name));

    warp::reply::json(&rooms)
}

use log::{error, info, warn};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{self, Filter};

use roomcast::config::ServerConfig;
use roomcast::constants::WS_PATH;
use roomcast::core::engine::{PresenceEngine, SharedEngine};
use roomcast::core::room::RoomRegistry;
use roomcast::handlers::rooms;
use roomcast::handlers::websocket::{handle_ws_client, ConnectParams};
use roomcast::storage::MemoryProfileStore;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, room_capacity={:?}",
        config.host, config.port, config.room_capacity
    );

    // Assemble the presence engine
    let registry = RoomRegistry::new(config.room_capacity);
    let profiles = Arc::new(MemoryProfileStore::new());
    let engine: SharedEngine = Arc::new(PresenceEngine::new(registry, profiles));

    let max_message_bytes = config.max_message_bytes;

    // WebSocket route: /ws?room=alpha&id=p1&zone=spawn
    let ws_route = warp::path(WS_PATH)
        .and(warp::ws())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_engine(engine.clone()))
        .map(move |ws: warp::ws::Ws, query: HashMap<String, String>, engine: SharedEngine| {
            let params = ConnectParams::from_query(&query);
            info!("New websocket connection for room '{}'", params.room);
            ws.max_message_size(max_message_bytes)
                .on_upgrade(move |socket| handle_ws_client(socket, engine, params))
        });

    // Room occupancy listing
    let rooms_route = warp::path("rooms")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(|engine: SharedEngine| async move {
            Ok::<_, Infallible>(rooms::list_rooms(engine).await)
        });

    // Health check route
    let health_route = warp::path("health").map(|| "OK");

    // Combine routes
    let routes = ws_route.or(rooms_route).or(health_route);

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    // Start the server
    info!("Starting roomcast server on {}", addr);

    warp::serve(routes).run(addr).await;
}

// Helper function to include the engine in request handling
fn with_engine(
    engine: SharedEngine,
) -> impl Filter<Extract = (SharedEngine,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

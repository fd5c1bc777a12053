// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3030;
pub const WS_PATH: &str = "ws";

// Presence defaults
pub const DEFAULT_ROOM_CAPACITY: usize = 64;
pub const DEFAULT_ZONE: &str = "spawn";

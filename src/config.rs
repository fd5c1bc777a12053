//! Server configuration module
//! Handles dynamic configuration parameters for the presence server

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROOM_CAPACITY};
use crate::error::{Result, RoomcastError};
use std::env;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum sessions per room (None for unlimited)
    pub room_capacity: Option<usize>,
    /// Maximum accepted inbound message size in bytes
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            room_capacity: Some(DEFAULT_ROOM_CAPACITY),
            max_message_bytes: 16 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("ROOMCAST_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("ROOMCAST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        // 0 means unlimited
        let room_capacity = match env::var("ROOMCAST_ROOM_CAPACITY")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
        {
            Some(0) => None,
            Some(n) => Some(n),
            None => Some(DEFAULT_ROOM_CAPACITY),
        };

        let max_message_bytes = env::var("ROOMCAST_MAX_MESSAGE_BYTES")
            .ok()
            .and_then(|b| b.parse().ok())
            .unwrap_or(16 * 1024);

        if max_message_bytes == 0 {
            return Err(RoomcastError::ConfigError(
                "ROOMCAST_MAX_MESSAGE_BYTES must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            room_capacity,
            max_message_bytes,
        })
    }

    /// Create a small-limits configuration for tests
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            room_capacity: Some(4),
            max_message_bytes: 1024,
        }
    }
}

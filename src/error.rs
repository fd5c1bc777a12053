use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum RoomcastError {
    // Join rejections
    MissingIdentity,
    RoomFull,
    AlreadyJoined(String),

    // Lookup failures
    SessionNotFound(String),
    RoomNotFound(String),

    // Inbound message errors
    ValidationError(String),

    // Connection errors
    ConnectionClosed,

    // Configuration errors
    ConfigError(String),
}

impl RoomcastError {
    /// Short machine-readable code carried in outbound error notices
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingIdentity => "missing_identity",
            Self::RoomFull => "room_full",
            Self::AlreadyJoined(_) => "already_joined",
            Self::SessionNotFound(_) => "session_not_found",
            Self::RoomNotFound(_) => "room_not_found",
            Self::ValidationError(_) => "validation_error",
            Self::ConnectionClosed => "connection_closed",
            Self::ConfigError(_) => "config_error",
        }
    }
}

impl fmt::Display for RoomcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentity => write!(f, "Missing or empty player identity"),
            Self::RoomFull => write!(f, "Room is full"),
            Self::AlreadyJoined(id) => write!(f, "Session already joined: {}", id),
            Self::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Self::RoomNotFound(name) => write!(f, "Room not found: {}", name),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RoomcastError {}

// Generic result type for roomcast
pub type Result<T> = std::result::Result<T, RoomcastError>;

//! Abstract profile store interface
//!
//! Durable player profile data lives outside this server; the engine only
//! consumes it once per join to populate the session's display payload.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Read-only lookup of durable profile data by external id.
/// A missing profile is not an error; the engine falls back to a default
/// payload.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, external_id: &str) -> Result<Option<Value>>;
}

/// Shared reference to a profile store backend
pub type SharedProfileStore = Arc<dyn ProfileStore>;

/// Payload used when no profile exists for an id
pub fn default_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

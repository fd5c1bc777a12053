//! In-memory profile store for development and testing

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::ProfileStore;
use crate::error::Result;

/// Profile store backed by an in-memory map
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, Value>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a profile
    pub async fn seed(&self, external_id: &str, payload: Value) {
        self.profiles
            .write()
            .await
            .insert(external_id.to_string(), payload);
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch_profile(&self, external_id: &str) -> Result<Option<Value>> {
        Ok(self.profiles.read().await.get(external_id).cloned())
    }
}

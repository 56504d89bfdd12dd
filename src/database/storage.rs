//! Durability seam for the record store and the user profile.
//!
//! Everything persisted by the tracker goes through [`KeyValueStore`]: a
//! handful of keys, each holding one JSON document that is replaced in full
//! on every write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use crate::error::Result;

/// Full serialized record store (all collections and id sequences).
pub const STORE_KEY: &str = "tracker-data";
/// Candidature array alone, kept for consumers that only need the list.
pub const CANDIDATURES_KEY: &str = "candidatures";
pub const PROFILE_KEY: &str = "user-profile";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    async fn set(&self, key: &str, value: JsonValue) -> Result<()>;
}

/// Process-local storage. Contents are lost when the last clone is dropped.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, JsonValue>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

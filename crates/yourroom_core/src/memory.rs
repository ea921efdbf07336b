//! crates/yourroom_core/src/memory.rs
//!
//! A process-local `CollectionStore`, used by tests and by embedders that do not
//! need durability.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::{CollectionStore, PortError, PortResult};

#[derive(Debug, Default)]
pub struct InMemoryCollectionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value, bypassing serialization. Handy for simulating corrupt data.
    pub fn with_raw(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Returns the raw text stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl CollectionStore for InMemoryCollectionStore {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

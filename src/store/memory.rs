use crate::errors::{AppError, AppResult};
use crate::store::StoreBackend;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|err| AppError::Internal(err.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|err| AppError::Internal(err.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use super::KeyValueStore;
use crate::utils::BoxFuture;

/// Process-local store. Contents vanish with the last clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> BoxFuture<'_, Result<Option<String>>> {
        let value = self.items().get(key).cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set_item(&self, key: &str, value: String) -> BoxFuture<'_, Result<()>> {
        self.items().insert(key.to_string(), value);
        Box::pin(async { Ok(()) })
    }

    fn remove_items(&self, keys: &[&str]) -> BoxFuture<'_, Result<()>> {
        let mut items = self.items();
        for key in keys {
            items.remove(*key);
        }
        Box::pin(async { Ok(()) })
    }
}

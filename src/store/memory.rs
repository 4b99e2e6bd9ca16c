//! In-memory key-value store with failure injection

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{KeyValueStore, StoreError};

/// Volatile store.
///
/// Clones share the same contents, so a test can keep a handle after giving
/// the store to a cache and inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    values: HashMap<String, Vec<u8>>,
    fail_writes: Option<String>,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following `set`/`remove` fail with `reason`
    pub fn fail_writes(&self, reason: &str) {
        self.lock().fail_writes = Some(reason.to_string());
    }

    /// Let writes succeed again
    pub fn heal(&self) {
        self.lock().fail_writes = None;
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Peek at a raw value
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().values.get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.fail_writes {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        inner.values.insert(key.to_string(), value.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.fail_writes {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        inner.values.remove(key);
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("k", b"v").unwrap();
        assert_eq!(handle.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_injected_failure_leaves_value_untouched() {
        let store = MemoryStore::new();
        store.set("k", b"old").unwrap();
        store.fail_writes("disk full");
        assert!(store.set("k", b"new").is_err());
        assert!(store.remove("k").is_err());
        assert_eq!(store.raw("k"), Some(b"old".to_vec()));

        store.heal();
        store.remove("k").unwrap();
        assert_eq!(store.raw("k"), None);
    }
}

//! Key/value storage port
//!
//! The engine only ever reads and writes whole string blobs by key, so the
//! backend can be browser LocalStorage, a map in memory, or anything else
//! implementing `Storage`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Blob storage by string key
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory storage; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Browser LocalStorage
///
/// Missing storage (private mode, disabled cookies) degrades to a store
/// that remembers nothing.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn new() -> Self {
        let inner = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if inner.is_none() {
            log::warn!("LocalStorage unavailable, progress will not be saved");
        }
        Self { inner }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.inner {
            if storage.set_item(key, value).is_err() {
                log::warn!("Failed to write {} to LocalStorage", key);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = &self.inner {
            let _ = storage.remove_item(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("a"), None);
        storage.set("a", "1");
        assert_eq!(storage.get("a").as_deref(), Some("1"));
        storage.remove("a");
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_clones_share() {
        let mut storage = MemoryStorage::new();
        let view = storage.clone();
        storage.set("k", "v");
        assert_eq!(view.get("k").as_deref(), Some("v"));
        assert_eq!(view.len(), 1);
    }
}

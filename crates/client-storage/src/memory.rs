//! In-memory storage adapter.

use crate::{SecureStorage, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory storage for tests and ephemeral profiles.
///
/// Clones share the same underlying map, which lets tests hand "the same
/// disk" to two independent stores and simulate a process restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(
            storage.get("test_key").unwrap(),
            Some("test_value".to_string())
        );

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_clones_share_data() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set("shared", "yes").unwrap();
        assert_eq!(other.get("shared").unwrap(), Some("yes".to_string()));

        other.delete("shared").unwrap();
        assert_eq!(storage.get("shared").unwrap(), None);
    }
}

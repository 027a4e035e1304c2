//! In-memory sequence store
//!
//! Suitable for testing and simulation. Clones share the same map, so a
//! test can drop a node and build a new one over the same store to simulate
//! a restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::trace;

use crate::SequenceStore;
use crate::error::StorageResult;

/// In-memory implementation of SequenceStore
///
/// Uses `DashMap` for concurrent access.
#[derive(Debug, Clone, Default)]
pub struct InMemorySequenceStore {
    values: Arc<DashMap<String, u32>>,
    /// Number of successful writes, for asserting flush behavior
    writes: Arc<AtomicUsize>,
}

impl InMemorySequenceStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes performed so far (across all clones)
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn get(&self, key: &str) -> StorageResult<u32> {
        Ok(self.values.get(key).map(|v| *v.value()).unwrap_or(0))
    }

    fn put(&self, key: &str, value: u32) -> StorageResult<()> {
        trace!(key, value, "Storing counter");
        self.values.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_zero() {
        let store = InMemorySequenceStore::new();
        assert_eq!(store.get("s_aabbccddeeff").unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_get() {
        let store = InMemorySequenceStore::new();
        store.put("r_010203040506", 17).unwrap();
        assert_eq!(store.get("r_010203040506").unwrap(), 17);

        store.put("r_010203040506", 18).unwrap();
        assert_eq!(store.get("r_010203040506").unwrap(), 18);
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let store = InMemorySequenceStore::new();
        let restarted = store.clone();

        store.put("s_x", 9).unwrap();
        assert_eq!(restarted.get("s_x").unwrap(), 9);
        assert_eq!(restarted.write_count(), 1);
    }
}

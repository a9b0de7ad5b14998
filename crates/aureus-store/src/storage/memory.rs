use std::collections::BTreeMap;

use super::Storage;
use crate::error::StoreError;

/// In-memory record store: a committed map plus a staging map that
/// `commit` folds in. Used by tests and by nodes run without a data
/// directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    committed: BTreeMap<Vec<u8>, Vec<u8>>,
    staged: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.staged
            .get(key)
            .or_else(|| self.committed.get(key))
            .cloned()
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.staged.insert(key.to_vec(), value.to_vec());
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        self.committed.extend(staged);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self
            .committed
            .keys()
            .chain(self.staged.keys())
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_records_visible_before_commit() {
        let mut storage = MemoryStorage::new();
        storage.put(b"chunk:1", b"record");
        assert_eq!(storage.get(b"chunk:1"), Some(b"record".to_vec()));

        storage.commit().unwrap();
        assert_eq!(storage.get(b"chunk:1"), Some(b"record".to_vec()));
    }

    #[test]
    fn test_staged_overwrites_committed() {
        let mut storage = MemoryStorage::new();
        storage.put(b"chunk:1", b"old");
        storage.commit().unwrap();

        storage.put(b"chunk:1", b"new");
        assert_eq!(storage.get(b"chunk:1"), Some(b"new".to_vec()));
        storage.commit().unwrap();
        assert_eq!(storage.get(b"chunk:1"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_missing_key() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(b"chunk:9"), None);
    }

    #[test]
    fn test_scan_prefix_merges_committed_and_staged() {
        let mut storage = MemoryStorage::new();
        storage.put(b"chunk:1", b"a");
        storage.put(b"digest:1", b"d");
        storage.commit().unwrap();
        storage.put(b"chunk:2", b"b");
        storage.put(b"chunk:1", b"a2");

        let keys = storage.scan_prefix(b"chunk:");
        assert_eq!(keys, vec![b"chunk:1".to_vec(), b"chunk:2".to_vec()]);
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::Storage;
use crate::error::StoreError;

/// File-backed record store holding one snapshot file.
///
/// Staged records live in memory; `commit` folds them into the committed
/// map and rewrites the snapshot atomically (temp file, then rename), so
/// a crash mid-commit leaves the previous snapshot intact. The snapshot
/// is a JSON object of hex-encoded keys to hex-encoded record bytes,
/// keeping the store's byte-exact contract independent of what the
/// records contain.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    committed: BTreeMap<Vec<u8>, Vec<u8>>,
    staged: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let committed = match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => decode_snapshot(&bytes)?,
            Ok(_) => BTreeMap::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };

        Ok(FileStorage {
            path,
            committed,
            staged: BTreeMap::new(),
        })
    }

    fn write_snapshot(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
        }

        let encoded: BTreeMap<String, String> = self
            .committed
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();
        let bytes = serde_json::to_vec(&encoded)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| StoreError::Storage(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn decode_snapshot(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, StoreError> {
    let encoded: BTreeMap<String, String> =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
    encoded
        .into_iter()
        .map(|(k, v)| {
            let key = hex::decode(&k).map_err(|e| StoreError::Serialization(e.to_string()))?;
            let value = hex::decode(&v).map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok((key, value))
        })
        .collect()
}

impl Storage for FileStorage {
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
        self.write_snapshot()
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

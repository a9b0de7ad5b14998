use aureus_core::canonical_json;
use aureus_ledger::LedgerChunk;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::storage::Storage;

const CHUNK_PREFIX: &[u8] = b"chunk:";
const DIGEST_PREFIX: &[u8] = b"digest:";

/// Persists the sequence of ledger chunks, keyed by slot index.
///
/// Each chunk is stored as its canonical JSON next to a digest record.
/// Loads recompute the chunk hash and compare it against the digest;
/// a mismatch is fatal corruption requiring operator intervention.
pub struct ChunkStore<S: Storage> {
    storage: S,
}

impl<S: Storage> ChunkStore<S> {
    pub fn new(storage: S) -> Self {
        ChunkStore { storage }
    }

    /// Write-through on chunk commit: both records land in one commit
    pub fn put_chunk(&mut self, slot: u64, chunk: &LedgerChunk) -> Result<(), StoreError> {
        let bytes = canonical_json(chunk)?;
        let digest = chunk.hash()?;
        self.storage.put(&chunk_key(slot), &bytes);
        self.storage
            .put(&digest_key(slot), digest.to_hex().as_bytes());
        self.storage.commit()?;
        debug!("persisted chunk for slot {} ({})", slot, digest);
        Ok(())
    }

    pub fn get_chunk(&self, slot: u64) -> Result<Option<LedgerChunk>, StoreError> {
        let Some(bytes) = self.storage.get(&chunk_key(slot)) else {
            return Ok(None);
        };
        let chunk: LedgerChunk = serde_json::from_slice(&bytes)
            .map_err(|_| StoreError::Corrupt { slot })?;

        let Some(stored_digest) = self.storage.get(&digest_key(slot)) else {
            return Err(StoreError::Corrupt { slot });
        };
        let computed = chunk.hash()?;
        if computed.to_hex().as_bytes() != stored_digest.as_slice() {
            return Err(StoreError::Corrupt { slot });
        }
        Ok(Some(chunk))
    }

    /// The highest slot with a stored chunk
    pub fn latest_slot(&self) -> Option<u64> {
        self.storage
            .scan_prefix(CHUNK_PREFIX)
            .into_iter()
            .filter_map(|key| parse_slot(&key))
            .max()
    }

    /// Load every chunk from slot 1 upward, stopping at the first gap.
    /// Used on startup to rebuild the account state.
    pub fn load_all(&self) -> Result<Vec<(u64, LedgerChunk)>, StoreError> {
        let mut chunks = Vec::new();
        let mut slot = 1;
        while let Some(chunk) = self.get_chunk(slot)? {
            chunks.push((slot, chunk));
            slot += 1;
        }
        info!("loaded {} chunks from storage", chunks.len());
        Ok(chunks)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

fn chunk_key(slot: u64) -> Vec<u8> {
    let mut key = CHUNK_PREFIX.to_vec();
    key.extend_from_slice(&slot.to_be_bytes());
    key
}

fn digest_key(slot: u64) -> Vec<u8> {
    let mut key = DIGEST_PREFIX.to_vec();
    key.extend_from_slice(&slot.to_be_bytes());
    key
}

fn parse_slot(key: &[u8]) -> Option<u64> {
    let rest = key.strip_prefix(CHUNK_PREFIX)?;
    let bytes: [u8; 8] = rest.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub mod file;
pub mod memory;

use crate::error::StoreError;

/// The store the ledger writes through. Its whole contract is byte-exact
/// get/put of JSON-encoded records: writes stage in memory and become
/// durable together on `commit`, and `scan_prefix` lists keys for the
/// recovery scan at startup. Chunk records are never deleted or rolled
/// back, so the contract carries neither.
pub trait Storage: Send + Sync {
    /// Read a record's exact bytes
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stage a record; visible to `get` immediately
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Make every staged record durable in one step
    fn commit(&mut self) -> Result<(), StoreError>;

    /// All keys under a prefix, committed or staged, in ascending order
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>>;
}

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Chunk {slot} is corrupt: stored digest does not match its content")]
    Corrupt { slot: u64 },

    #[error("Ledger error: {0}")]
    Ledger(#[from] aureus_ledger::LedgerError),

    #[error("Core error: {0}")]
    Core(#[from] aureus_core::CoreError),
}

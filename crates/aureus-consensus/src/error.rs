use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Message for wrong slot: expected {expected}, got {got}")]
    WrongSlot { expected: u64, got: u64 },

    #[error("Slot {got} is too far ahead of {local}")]
    SlotTooFarAhead { local: u64, got: u64 },

    #[error("Malformed quorum slice: threshold {threshold} of {members} members")]
    MalformedSlice { threshold: u16, members: usize },

    #[error("Unexpected message kind for this protocol stage")]
    UnexpectedMessage,

    #[error("Ledger error: {0}")]
    Ledger(#[from] aureus_ledger::LedgerError),

    #[error("Core error: {0}")]
    Core(#[from] aureus_core::CoreError),
}

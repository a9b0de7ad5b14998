use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Bad sequence: expected {expected}, got {got}")]
    BadSequence { expected: u32, got: u32 },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("Core error: {0}")]
    Core(#[from] aureus_core::CoreError),
}

use std::collections::BTreeMap;

use aureus_core::{hash_sha3, Account, Address, Hash, SignedOperation};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

const TRANSACTIONS_TAG: u8 = 0x01;
const STATE_TAG: u8 = 0x02;

/// One slot's worth of applied transactions together with the resulting
/// account state. Chunk hashes link consecutive ledger states: each hash
/// seeds the next slot's leader ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerChunk {
    pub transactions: Vec<SignedOperation>,
    pub state: BTreeMap<Address, Account>,
}

impl LedgerChunk {
    pub fn new(transactions: Vec<SignedOperation>, state: BTreeMap<Address, Account>) -> Self {
        LedgerChunk {
            transactions,
            state,
        }
    }

    /// The canonical chunk hash.
    ///
    /// SHA3-512 over: a transactions tag; each transaction's canonical
    /// bytes, u32-BE length-prefixed, in order; a state tag; then each
    /// state entry ascending by address as u16-BE address length, address
    /// bytes, u32-BE sequence, u64-BE balance. Every byte of the canonical
    /// form is covered, so any change to a transaction, an account entry,
    /// or the binding between them changes the hash.
    pub fn hash(&self) -> Result<Hash, LedgerError> {
        let mut bytes = Vec::new();

        bytes.push(TRANSACTIONS_TAG);
        for tx in &self.transactions {
            let canonical = tx.canonical_bytes()?;
            bytes.extend_from_slice(&(canonical.len() as u32).to_be_bytes());
            bytes.extend_from_slice(&canonical);
        }

        bytes.push(STATE_TAG);
        for (address, account) in &self.state {
            let addr = address.as_bytes();
            bytes.extend_from_slice(&(addr.len() as u16).to_be_bytes());
            bytes.extend_from_slice(addr);
            bytes.extend_from_slice(&account.sequence.to_be_bytes());
            bytes.extend_from_slice(&account.balance.to_be_bytes());
        }

        Ok(hash_sha3(&bytes))
    }
}

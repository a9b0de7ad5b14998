use serde::{Deserialize, Serialize};

use crate::types::address::Address;

/// Operations that can be carried by a signed envelope.
///
/// The wire form is canonical JSON with the variant name in the
/// `OperationType` tag and PascalCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "OperationType")]
pub enum Operation {
    /// Transfer currency to another account
    #[serde(rename_all = "PascalCase")]
    Send {
        signer: Address,
        sequence: u32,
        fee: u64,
        to: Address,
        amount: u64,
    },
    /// Update the contents of the signer's document
    #[serde(rename_all = "PascalCase")]
    Update {
        signer: Address,
        sequence: u32,
        fee: u64,
        data: serde_json::Value,
    },
}

impl Operation {
    pub fn signer(&self) -> &Address {
        match self {
            Operation::Send { signer, .. } => signer,
            Operation::Update { signer, .. } => signer,
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            Operation::Send { sequence, .. } => *sequence,
            Operation::Update { sequence, .. } => *sequence,
        }
    }

    pub fn fee(&self) -> u64 {
        match self {
            Operation::Send { fee, .. } => *fee,
            Operation::Update { fee, .. } => *fee,
        }
    }

    /// The amount transferred out of the signer's account, excluding fee
    pub fn amount(&self) -> u64 {
        match self {
            Operation::Send { amount, .. } => *amount,
            Operation::Update { .. } => 0,
        }
    }

    /// Total cost to the signer: amount plus fee
    pub fn cost(&self) -> u64 {
        self.amount().saturating_add(self.fee())
    }

    /// Structural validity, independent of any ledger state
    pub fn validate(&self) -> bool {
        if self.sequence() == 0 {
            return false;
        }
        match self {
            Operation::Send { amount, .. } => *amount > 0,
            Operation::Update { data, .. } => data.is_object(),
        }
    }
}

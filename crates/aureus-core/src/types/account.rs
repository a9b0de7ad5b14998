use serde::{Deserialize, Serialize};

/// An account in the ledger state.
/// A missing account is equivalent to the default (sequence 0, balance 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Account {
    /// Sequence number of the last applied operation. Monotonically
    /// non-decreasing; the next valid operation carries sequence + 1.
    pub sequence: u32,
    /// Available balance
    pub balance: u64,
}

impl Account {
    pub fn new(sequence: u32, balance: u64) -> Self {
        Account { sequence, balance }
    }

    /// Whether this account can afford a debit of the given size
    pub fn can_afford(&self, amount: u64) -> bool {
        self.balance >= amount
    }
}

use std::collections::BTreeMap;

use aureus_core::{Account, Address, SignedOperation};
use tracing::debug;

use crate::error::LedgerError;

/// The account state: a map from address to account, mutated only by
/// applying signed operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStore {
    accounts: BTreeMap<Address, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        AccountStore {
            accounts: BTreeMap::new(),
        }
    }

    /// Build a store from existing entries
    pub fn from_accounts(accounts: BTreeMap<Address, Account>) -> Self {
        AccountStore { accounts }
    }

    /// Get an account. Absence is equivalent to the default account.
    pub fn get(&self, address: &Address) -> Account {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    /// Set an account directly (genesis and replay only)
    pub fn set(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Credit an account, creating it on first credit
    pub fn credit(&mut self, address: &Address, amount: u64) {
        if amount == 0 {
            return;
        }
        let account = self.accounts.entry(address.clone()).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Whether an operation is applicable to the current state: its
    /// sequence must be exactly one past the signer's, and the signer must
    /// cover amount plus fee.
    pub fn validate(&self, tx: &SignedOperation) -> bool {
        let account = self.get(tx.operation.signer());
        tx.operation.sequence() == account.sequence + 1 && account.can_afford(tx.operation.cost())
    }

    /// Apply a single operation. Precondition: `validate(tx)`.
    /// Debits the signer, credits the recipient of a Send, bumps the
    /// signer's sequence. Fees are burned.
    pub fn apply(&mut self, tx: &SignedOperation) -> Result<(), LedgerError> {
        let signer = tx.operation.signer().clone();
        let account = self.get(&signer);

        if tx.operation.sequence() != account.sequence + 1 {
            return Err(LedgerError::BadSequence {
                expected: account.sequence + 1,
                got: tx.operation.sequence(),
            });
        }
        let cost = tx.operation.cost();
        if !account.can_afford(cost) {
            return Err(LedgerError::InsufficientBalance {
                have: account.balance,
                need: cost,
            });
        }

        self.accounts.insert(
            signer,
            Account {
                sequence: account.sequence + 1,
                balance: account.balance - cost,
            },
        );

        if let aureus_core::Operation::Send { to, amount, .. } = &tx.operation {
            self.credit(to, *amount);
        }

        Ok(())
    }

    /// Apply a batch in order. The whole batch aborts on the first failure
    /// and the store is left untouched; callers propose only batches they
    /// have pre-validated against a snapshot.
    pub fn apply_batch(&mut self, txs: &[SignedOperation]) -> Result<(), LedgerError> {
        let mut working = self.clone();
        for tx in txs {
            if let Err(e) = working.apply(tx) {
                debug!("batch aborted at {:?}: {}", tx.operation.signer(), e);
                return Err(e);
            }
        }
        *self = working;
        Ok(())
    }

    /// A copy of the state for pre-validation
    pub fn snapshot(&self) -> AccountStore {
        self.clone()
    }

    /// All accounts, sorted by address
    pub fn accounts(&self) -> &BTreeMap<Address, Account> {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aureus_core::{KeyPair, Operation};

    fn funded(store: &mut AccountStore, balance: u64) -> KeyPair {
        let kp = KeyPair::generate();
        store.credit(&Address::from_public_key(&kp.public), balance);
        kp
    }

    fn send(from: &KeyPair, to: &Address, sequence: u32, amount: u64, fee: u64) -> SignedOperation {
        let op = Operation::Send {
            signer: Address::from_public_key(&from.public),
            sequence,
            fee,
            to: to.clone(),
            amount,
        };
        SignedOperation::sign(op, from).unwrap()
    }

    #[test]
    fn test_absent_account_is_default() {
        let store = AccountStore::new();
        let account = store.get(&Address::from("missing"));
        assert_eq!(account, Account::default());
    }

    #[test]
    fn test_apply_send() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 1000);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        let tx = send(&alice, &bob, 1, 300, 5);
        assert!(store.validate(&tx));
        store.apply(&tx).unwrap();

        let alice_addr = Address::from_public_key(&alice.public);
        assert_eq!(store.get(&alice_addr).balance, 695);
        assert_eq!(store.get(&alice_addr).sequence, 1);
        assert_eq!(store.get(&bob).balance, 300);
        assert_eq!(store.get(&bob).sequence, 0);
    }

    #[test]
    fn test_apply_bad_sequence() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 1000);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        let tx = send(&alice, &bob, 2, 100, 1);
        assert!(!store.validate(&tx));
        assert!(matches!(
            store.apply(&tx),
            Err(LedgerError::BadSequence { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_apply_insufficient_balance() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 100);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        let tx = send(&alice, &bob, 1, 100, 1);
        assert!(matches!(
            store.apply(&tx),
            Err(LedgerError::InsufficientBalance { have: 100, need: 101 })
        ));
    }

    #[test]
    fn test_fee_is_burned() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 1000);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        store.apply(&send(&alice, &bob, 1, 400, 100)).unwrap();

        let total: u64 = store.accounts().values().map(|a| a.balance).sum();
        assert_eq!(total, 900);
    }

    #[test]
    fn test_batch_aborts_atomically() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 1000);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        let good = send(&alice, &bob, 1, 100, 1);
        let bad = send(&alice, &bob, 5, 100, 1); // sequence gap

        let before = store.clone();
        assert!(store.apply_batch(&[good, bad]).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 1000);
        let bob = Address::from_public_key(&KeyPair::generate().public);

        let txs = vec![
            send(&alice, &bob, 1, 100, 1),
            send(&alice, &bob, 2, 100, 1),
        ];
        store.apply_batch(&txs).unwrap();

        let alice_addr = Address::from_public_key(&alice.public);
        assert_eq!(store.get(&alice_addr).sequence, 2);
        assert_eq!(store.get(&bob).balance, 200);
    }

    #[test]
    fn test_update_costs_only_fee() {
        let mut store = AccountStore::new();
        let alice = funded(&mut store, 100);
        let op = Operation::Update {
            signer: Address::from_public_key(&alice.public),
            sequence: 1,
            fee: 10,
            data: serde_json::json!({"title": "aureus"}),
        };
        let tx = SignedOperation::sign(op, &alice).unwrap();

        store.apply(&tx).unwrap();
        let alice_addr = Address::from_public_key(&alice.public);
        assert_eq!(store.get(&alice_addr).balance, 90);
        assert_eq!(store.get(&alice_addr).sequence, 1);
    }
}

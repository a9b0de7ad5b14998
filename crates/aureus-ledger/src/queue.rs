use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use aureus_core::{Address, SignedOperation};
use tracing::{debug, warn};

use crate::store::AccountStore;

/// Default queue capacity
pub const QUEUE_LIMIT: usize = 1000;

/// Eviction order: lowest fee first, ties broken by highest sequence, then
/// canonical bytes descending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EvictionKey {
    fee: u64,
    sequence: Reverse<u32>,
    identity: Reverse<Vec<u8>>,
}

impl EvictionKey {
    fn new(tx: &SignedOperation, identity: Vec<u8>) -> Self {
        EvictionKey {
            fee: tx.operation.fee(),
            sequence: Reverse(tx.operation.sequence()),
            identity: Reverse(identity),
        }
    }
}

/// A bounded fee-priority queue of pending signed operations.
///
/// Admission is balance-aware: the queue keeps its own view of account
/// state and rejects operations a signer could not afford given everything
/// already queued from them.
#[derive(Debug, Clone, Default)]
pub struct TransactionQueue {
    limit: usize,
    accounts: AccountStore,
    /// Operations keyed by canonical bytes
    by_identity: BTreeMap<Vec<u8>, SignedOperation>,
    /// Identities grouped by signer
    by_signer: BTreeMap<Address, BTreeSet<Vec<u8>>>,
    /// Eviction index; the first entry is the next eviction victim
    by_priority: BTreeSet<EvictionKey>,
}

impl TransactionQueue {
    pub fn new(limit: usize) -> Self {
        TransactionQueue {
            limit,
            ..Default::default()
        }
    }

    /// Replace the queue's account view (genesis / tests)
    pub fn set_balance(&mut self, address: &Address, balance: u64) {
        let mut account = self.accounts.get(address);
        account.balance = balance;
        self.accounts.set(address.clone(), account);
    }

    /// Add an operation. Unsigned or unverifiable operations and
    /// operations the signer cannot afford are silently dropped.
    /// Idempotent on duplicate canonical bytes.
    pub fn add(&mut self, tx: SignedOperation) {
        if !tx.verify() {
            debug!("dropping unverifiable operation from queue");
            return;
        }
        let identity = match tx.canonical_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("unserializable operation: {}", e);
                return;
            }
        };
        if self.by_identity.contains_key(&identity) {
            return;
        }

        let signer = tx.operation.signer().clone();
        let queued_cost: u64 = self
            .by_signer
            .get(&signer)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.by_identity.get(id))
                    .map(|queued| queued.operation.cost())
                    .sum()
            })
            .unwrap_or(0);
        let projected = queued_cost.saturating_add(tx.operation.cost());
        if self.accounts.get(&signer).balance < projected {
            debug!("dropping operation from {:?}: projected balance short", signer);
            return;
        }

        self.by_priority
            .insert(EvictionKey::new(&tx, identity.clone()));
        self.by_signer
            .entry(signer)
            .or_default()
            .insert(identity.clone());
        self.by_identity.insert(identity, tx);

        while self.by_identity.len() > self.limit {
            self.evict_lowest();
        }
    }

    /// Remove an operation by canonical identity; no-op when absent
    pub fn remove(&mut self, tx: &SignedOperation) {
        if let Ok(identity) = tx.canonical_bytes() {
            self.remove_identity(&identity);
        }
    }

    fn remove_identity(&mut self, identity: &[u8]) -> Option<SignedOperation> {
        let tx = self.by_identity.remove(identity)?;
        self.by_priority
            .remove(&EvictionKey::new(&tx, identity.to_vec()));
        let signer = tx.operation.signer().clone();
        if let Some(ids) = self.by_signer.get_mut(&signer) {
            ids.remove(identity);
            if ids.is_empty() {
                self.by_signer.remove(&signer);
            }
        }
        Some(tx)
    }

    fn evict_lowest(&mut self) {
        if let Some(victim) = self.by_priority.iter().next().cloned() {
            let identity = victim.identity.0.clone();
            self.remove_identity(&identity);
            debug!("evicted lowest-fee operation (fee {})", victim.fee);
        }
    }

    /// Up to `k` operations ordered by (fee desc, signer, sequence asc),
    /// never emitting a signer's sequence `s + 1` before `s`.
    pub fn top(&self, k: usize) -> Vec<SignedOperation> {
        let mut remaining: Vec<&SignedOperation> = self.by_identity.values().collect();
        remaining.sort_by(|a, b| {
            b.operation
                .fee()
                .cmp(&a.operation.fee())
                .then_with(|| a.operation.signer().cmp(b.operation.signer()))
                .then_with(|| a.operation.sequence().cmp(&b.operation.sequence()))
        });

        let mut next_sequence: BTreeMap<Address, u32> = BTreeMap::new();
        let mut result = Vec::new();

        // A signer's later operations only unblock once the earlier ones
        // are taken, so keep sweeping until a pass makes no progress.
        loop {
            let mut progressed = false;
            remaining.retain(|tx| {
                if result.len() >= k {
                    return true;
                }
                let signer = tx.operation.signer();
                let expected = next_sequence
                    .entry(signer.clone())
                    .or_insert_with(|| self.accounts.get(signer).sequence + 1);
                if tx.operation.sequence() == *expected {
                    result.push((*tx).clone());
                    *expected += 1;
                    progressed = true;
                    false
                } else {
                    true
                }
            });
            if !progressed || result.len() >= k {
                break;
            }
        }
        result
    }

    /// Re-point the queue at a new ledger state and drop operations it
    /// invalidates: stale sequences and runs a signer can no longer afford.
    pub fn refresh(&mut self, store: &AccountStore) {
        self.accounts = store.snapshot();

        let mut stale = Vec::new();
        for (signer, ids) in &self.by_signer {
            let account = self.accounts.get(signer);
            let mut txs: Vec<(&Vec<u8>, &SignedOperation)> = ids
                .iter()
                .filter_map(|id| self.by_identity.get(id).map(|tx| (id, tx)))
                .collect();
            txs.sort_by_key(|(_, tx)| tx.operation.sequence());

            let mut balance = account.balance;
            for (id, tx) in txs {
                if tx.operation.sequence() <= account.sequence {
                    stale.push(id.clone());
                } else if tx.operation.cost() > balance {
                    stale.push(id.clone());
                } else {
                    balance -= tx.operation.cost();
                }
            }
        }
        for identity in stale {
            self.remove_identity(&identity);
        }
    }

    pub fn size(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}

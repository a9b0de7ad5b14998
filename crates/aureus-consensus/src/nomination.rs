use std::collections::{BTreeMap, BTreeSet};

use aureus_core::Address;
use tracing::debug;

use crate::error::ConsensusError;
use crate::message::Message;
use crate::seed::seed_sort;
use crate::slice;
use crate::slice::QuorumSlice;
use crate::value::SlotValue;

/// Per-slot nomination state: federated voting over which values are
/// candidates for the slot. `y` and `z` only ever grow.
#[derive(Debug, Clone)]
pub struct NominationState {
    me: Address,
    slice: QuorumSlice,
    slot: u64,
    /// Seed for leader selection this round
    seed: String,
    /// Values we have voted to nominate
    x: BTreeSet<SlotValue>,
    /// Values we have accepted as nominated
    y: BTreeSet<SlotValue>,
    /// Candidate values (confirmed nominated)
    z: BTreeSet<SlotValue>,
    /// The last nominate message received from each peer
    n: BTreeMap<Address, Message>,
    dirty: bool,
}

impl NominationState {
    pub fn new(me: Address, slice: QuorumSlice, slot: u64, seed: String) -> Self {
        NominationState {
            me,
            slice,
            slot,
            seed,
            x: BTreeSet::new(),
            y: BTreeSet::new(),
            z: BTreeSet::new(),
            n: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Whether we have anything to nominate yet
    pub fn has_nomination(&self) -> bool {
        !self.x.is_empty() || !self.y.is_empty()
    }

    /// Start nominating `value` if we are not nominating anything yet
    pub fn set_default(&mut self, value: SlotValue) {
        if self.has_nomination() {
            return;
        }
        self.x.insert(value);
        self.dirty = true;
    }

    /// The nomination leader for this round: first in seed order among the
    /// configured slice members.
    pub fn leader(&self) -> Option<Address> {
        seed_sort(&self.seed, &self.slice.members).into_iter().next()
    }

    /// Handle an incoming nomination message from a peer. A repeat message
    /// from the same peer overwrites the previous one; messages nominating
    /// nothing are ignored.
    pub fn handle(&mut self, peer: Address, msg: Message) -> Result<(), ConsensusError> {
        let (voted, accepted) = match &msg {
            Message::Nominate { slot, voted, accepted, .. } => {
                if *slot != self.slot {
                    return Err(ConsensusError::WrongSlot {
                        expected: self.slot,
                        got: *slot,
                    });
                }
                (voted.clone(), accepted.clone())
            }
            _ => return Err(ConsensusError::UnexpectedMessage),
        };
        if voted.is_empty() && accepted.is_empty() {
            return Ok(());
        }

        let fresh: BTreeSet<SlotValue> = voted.into_iter().chain(accepted).collect();
        self.n.insert(peer, msg);

        // Test everything in sight, not just this message's values: a new
        // voter can unlock a value an earlier message proposed.
        let mut candidates = fresh.clone();
        candidates.extend(self.x.iter().cloned());
        for stored in self.n.values() {
            if let Message::Nominate { voted, accepted, .. } = stored {
                candidates.extend(voted.iter().cloned());
                candidates.extend(accepted.iter().cloned());
            }
        }

        let peer_slices = self.peer_slices();
        let mut y_grew = false;

        // Accepting a value can enable further accepts (our own acceptance
        // counts toward the quorum), so run promotions to a fixpoint.
        loop {
            let mut changed = false;

            let newly_accepted: Vec<SlotValue> = candidates
                .iter()
                .filter(|v| !self.y.contains(*v))
                .filter(|v| self.test_accept(&peer_slices, v))
                .cloned()
                .collect();
            for value in newly_accepted {
                debug!("accepted nomination of {} operations", value.len());
                self.x.remove(&value);
                self.y.insert(value);
                y_grew = true;
                changed = true;
                self.dirty = true;
            }

            let newly_confirmed: Vec<SlotValue> = self
                .y
                .iter()
                .filter(|v| !self.z.contains(*v))
                .filter(|v| self.test_confirm(&peer_slices, v))
                .cloned()
                .collect();
            for value in newly_confirmed {
                debug!("confirmed candidate of {} operations", value.len());
                self.z.insert(value);
                changed = true;
                self.dirty = true;
            }

            if !changed {
                break;
            }
        }

        // Follow the leader: vote for whatever the round's leader has
        // voted for among the values we just saw.
        if y_grew {
            if let Some(leader) = self.leader() {
                let echoes: Vec<SlotValue> = fresh
                    .iter()
                    .filter(|v| self.node_votes(&leader, v))
                    .filter(|v| !self.x.contains(*v) && !self.y.contains(*v))
                    .cloned()
                    .collect();
                for value in echoes {
                    self.x.insert(value);
                    self.dirty = true;
                }
            }
        }

        Ok(())
    }

    /// A candidate exists once any value is confirmed nominated
    pub fn has_candidate(&self) -> bool {
        !self.z.is_empty()
    }

    /// The slot's nominated value: the combination of all candidates
    pub fn candidate_value(&self) -> Option<SlotValue> {
        if self.z.is_empty() {
            return None;
        }
        Some(SlotValue::combine_all(self.z.iter()))
    }

    /// The nominate message reflecting the current state, if the state
    /// changed since the last emission
    pub fn take_message(&mut self) -> Option<Message> {
        if !self.dirty || !self.has_nomination() {
            return None;
        }
        self.dirty = false;
        Some(Message::Nominate {
            slot: self.slot,
            voted: self.x.iter().cloned().collect(),
            accepted: self.y.iter().cloned().collect(),
            slice: self.slice.clone(),
        })
    }

    fn peer_slices(&self) -> BTreeMap<Address, QuorumSlice> {
        self.n
            .iter()
            .map(|(peer, msg)| (peer.clone(), msg.slice().clone()))
            .collect()
    }

    fn node_votes(&self, node: &Address, value: &SlotValue) -> bool {
        if *node == self.me {
            return self.x.contains(value);
        }
        match self.n.get(node) {
            Some(Message::Nominate { voted, .. }) => voted.contains(value),
            _ => false,
        }
    }

    fn node_votes_or_accepts(&self, node: &Address, value: &SlotValue) -> bool {
        if *node == self.me {
            return self.x.contains(value) || self.y.contains(value);
        }
        match self.n.get(node) {
            Some(Message::Nominate { voted, accepted, .. }) => {
                voted.contains(value) || accepted.contains(value)
            }
            _ => false,
        }
    }

    fn node_accepts(&self, node: &Address, value: &SlotValue) -> bool {
        if *node == self.me {
            return self.y.contains(value);
        }
        match self.n.get(node) {
            Some(Message::Nominate { accepted, .. }) => accepted.contains(value),
            _ => false,
        }
    }

    fn test_accept(&self, peer_slices: &BTreeMap<Address, QuorumSlice>, value: &SlotValue) -> bool {
        slice::accept(
            &self.me,
            &self.slice,
            peer_slices,
            |node| self.node_votes_or_accepts(node, value),
            |node| self.node_accepts(node, value),
        )
    }

    fn test_confirm(&self, peer_slices: &BTreeMap<Address, QuorumSlice>, value: &SlotValue) -> bool {
        slice::confirm(&self.me, &self.slice, peer_slices, |node| {
            self.node_accepts(node, value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aureus_core::{KeyPair, Operation, SecretKey, SignedOperation};

    fn addr(name: &str) -> Address {
        Address::from(name)
    }

    fn value(n: u64) -> SlotValue {
        let kp = KeyPair::from_secret(SecretKey::from_bytes(&[n as u8; 32]));
        let op = Operation::Send {
            signer: Address::from_public_key(&kp.public),
            sequence: 1,
            fee: n,
            to: Address::from("f000000000000000000000000000000000000000000000000000000000000000"),
            amount: n,
        };
        SlotValue::new(vec![SignedOperation::sign(op, &kp).unwrap()])
    }

    fn four_node_slice() -> QuorumSlice {
        QuorumSlice::new(
            vec![addr("v"), addr("a"), addr("b"), addr("c")],
            3,
        )
        .unwrap()
    }

    fn nominate(slot: u64, voted: Vec<SlotValue>, accepted: Vec<SlotValue>) -> Message {
        Message::Nominate {
            slot,
            voted,
            accepted,
            slice: four_node_slice(),
        }
    }

    fn state() -> NominationState {
        NominationState::new(addr("v"), four_node_slice(), 1, "slot:1:round:0".to_string())
    }

    #[test]
    fn test_set_default_once() {
        let mut s = state();
        s.set_default(value(1));
        s.set_default(value(2));
        assert!(s.has_nomination());
        let msg = s.take_message().unwrap();
        match msg {
            Message::Nominate { voted, .. } => assert_eq!(voted, vec![value(1)]),
            _ => panic!("expected nominate"),
        }
    }

    #[test]
    fn test_empty_message_ignored() {
        let mut s = state();
        s.handle(addr("a"), nominate(1, vec![], vec![])).unwrap();
        assert!(s.take_message().is_none());
    }

    #[test]
    fn test_wrong_slot_rejected() {
        let mut s = state();
        let result = s.handle(addr("a"), nominate(9, vec![value(1)], vec![]));
        assert!(matches!(result, Err(ConsensusError::WrongSlot { .. })));
    }

    #[test]
    fn test_accept_via_quorum_of_votes() {
        let mut s = state();
        let v = value(1);
        s.set_default(v.clone());
        // Two peers voting plus our own vote is a 3-of-4 quorum
        s.handle(addr("a"), nominate(1, vec![v.clone()], vec![])).unwrap();
        assert!(!s.has_candidate());
        s.handle(addr("b"), nominate(1, vec![v.clone()], vec![])).unwrap();

        let msg = s.take_message().unwrap();
        match msg {
            Message::Nominate { voted, accepted, .. } => {
                assert!(voted.is_empty());
                assert_eq!(accepted, vec![v]);
            }
            _ => panic!("expected nominate"),
        }
    }

    #[test]
    fn test_accept_via_blocking_set() {
        let mut s = state();
        let v = value(1);
        // We never voted for v, but two accepters block every 3-of-4 slice
        s.handle(addr("a"), nominate(1, vec![], vec![v.clone()])).unwrap();
        s.handle(addr("b"), nominate(1, vec![], vec![v.clone()])).unwrap();

        let msg = s.take_message().unwrap();
        match msg {
            Message::Nominate { accepted, .. } => assert_eq!(accepted, vec![v]),
            _ => panic!("expected nominate"),
        }
    }

    #[test]
    fn test_confirm_promotes_candidate() {
        let mut s = state();
        let v = value(1);
        s.set_default(v.clone());
        // Everyone has accepted: quorum of accepters confirms
        s.handle(addr("a"), nominate(1, vec![], vec![v.clone()])).unwrap();
        s.handle(addr("b"), nominate(1, vec![], vec![v.clone()])).unwrap();
        s.handle(addr("c"), nominate(1, vec![], vec![v.clone()])).unwrap();

        assert!(s.has_candidate());
        assert_eq!(s.candidate_value().unwrap(), v);
    }

    #[test]
    fn test_candidates_combine() {
        let mut s = state();
        let v1 = value(1);
        let v2 = value(2);
        for v in [&v1, &v2] {
            s.handle(addr("a"), nominate(1, vec![], vec![v1.clone(), v2.clone()])).unwrap();
            s.handle(addr("b"), nominate(1, vec![], vec![v1.clone(), v2.clone()])).unwrap();
            s.handle(addr("c"), nominate(1, vec![], vec![v.clone()])).unwrap();
        }
        assert!(s.has_candidate());
        assert_eq!(s.candidate_value().unwrap(), v1.combine(&v2));
    }

    #[test]
    fn test_monotone_sets() {
        let mut s = state();
        let v = value(1);
        s.set_default(v.clone());
        s.handle(addr("a"), nominate(1, vec![v.clone()], vec![])).unwrap();
        s.handle(addr("b"), nominate(1, vec![v.clone()], vec![])).unwrap();
        // A peer "retracting" its vote cannot shrink y
        s.handle(addr("a"), nominate(1, vec![value(2)], vec![])).unwrap();
        let _ = s.take_message();
        assert!(s.node_accepts(&addr("v"), &v));
    }

    #[test]
    fn test_duplicate_overwrites() {
        let mut s = state();
        s.handle(addr("a"), nominate(1, vec![value(1)], vec![])).unwrap();
        s.handle(addr("a"), nominate(1, vec![value(2)], vec![])).unwrap();
        assert!(s.node_votes(&addr("a"), &value(2)));
        assert!(!s.node_votes(&addr("a"), &value(1)));
    }
}

use std::collections::{BTreeMap, BTreeSet};

use aureus_core::Address;
use tracing::{debug, info};

use crate::ballot::Ballot;
use crate::error::ConsensusError;
use crate::message::{ballot_fields, Message};
use crate::slice;
use crate::slice::QuorumSlice;
use crate::value::SlotValue;

/// The three phases of the ballot protocol. Strictly monotone: a slot
/// moves Prepare -> Confirm -> Externalize and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BallotPhase {
    Prepare,
    Confirm,
    Externalize,
}

/// Per-slot ballot state.
///
/// In the Prepare phase, `c..h` is the interval we have voted to commit.
/// In the Confirm phase, it is the interval we have accepted committed.
/// In the Externalize phase, it is the confirmed interval and `h.x` is the
/// slot's decided value. Whenever `c` is set, `c <= h <= b`.
#[derive(Debug, Clone)]
pub struct BallotState {
    me: Address,
    slice: QuorumSlice,
    slot: u64,
    phase: BallotPhase,
    /// The ballot we are currently trying to prepare and commit
    b: Option<Ballot>,
    /// Highest accepted-prepared ballot
    p: Option<Ballot>,
    /// Next-highest accepted-prepared ballot, with a different value
    p_prime: Option<Ballot>,
    c: Option<Ballot>,
    h: Option<Ballot>,
    /// The value to use in the next ballot
    z: Option<SlotValue>,
    /// The last ballot message received from each peer
    m: BTreeMap<Address, Message>,
    dirty: bool,
}

impl BallotState {
    pub fn new(me: Address, slice: QuorumSlice, slot: u64) -> Self {
        BallotState {
            me,
            slice,
            slot,
            phase: BallotPhase::Prepare,
            b: None,
            p: None,
            p_prime: None,
            c: None,
            h: None,
            z: None,
            m: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn phase(&self) -> BallotPhase {
        self.phase
    }

    pub fn ballot_counter(&self) -> Option<u32> {
        self.b.as_ref().map(|b| b.n)
    }

    pub fn has_started(&self) -> bool {
        self.b.is_some()
    }

    /// The decided value once the slot has externalized, with the
    /// confirmed commit counters.
    pub fn externalized(&self) -> Option<(SlotValue, u32, u32)> {
        if self.phase != BallotPhase::Externalize {
            return None;
        }
        match (&self.c, &self.h) {
            (Some(c), Some(h)) => Some((h.x.clone(), c.n, h.n)),
            _ => None,
        }
    }

    /// Start balloting the nominated candidate if no ballot is active yet
    pub fn maybe_start(&mut self, candidate: SlotValue) {
        if self.b.is_some() || candidate.is_empty() {
            return;
        }
        debug!("starting ballot 1 with {} operations", candidate.len());
        self.b = Some(Ballot::new(1, candidate.clone()));
        self.z = Some(candidate);
        self.dirty = true;
        self.update();
    }

    /// Ballot escalation: no progress before the deadline, so move to the
    /// next counter and re-vote our value. A no-op after externalization.
    pub fn bump(&mut self) {
        if self.phase == BallotPhase::Externalize {
            return;
        }
        let value = match self.phase {
            BallotPhase::Confirm => self.h.as_ref().map(|h| h.x.clone()),
            _ => self.z.clone(),
        };
        if let (Some(b), Some(value)) = (&self.b, value) {
            let next = Ballot::new(b.n + 1, value);
            if let Some(c) = &self.c {
                if !c.compatible(&next) {
                    self.c = None;
                    self.h = None;
                }
            }
            debug!("escalating to ballot {}", next.n);
            self.b = Some(next);
            self.dirty = true;
            self.update();
        }
    }

    /// Handle an incoming ballot message from a peer. After
    /// externalization messages are recorded but can no longer change the
    /// decided value.
    pub fn handle(&mut self, peer: Address, msg: Message) -> Result<(), ConsensusError> {
        if !msg.is_ballot() {
            return Err(ConsensusError::UnexpectedMessage);
        }
        if msg.slot() != self.slot {
            return Err(ConsensusError::WrongSlot {
                expected: self.slot,
                got: msg.slot(),
            });
        }
        self.m.insert(peer, msg);
        if self.phase == BallotPhase::Externalize {
            return Ok(());
        }
        self.update();
        Ok(())
    }

    /// The wire message reflecting the current state, if it changed since
    /// the last emission
    pub fn take_message(&mut self) -> Option<Message> {
        if !self.dirty {
            return None;
        }
        let msg = self.wire_message()?;
        self.dirty = false;
        Some(msg)
    }

    /// The message this node currently asserts, independent of dirtiness.
    /// Also used as our own input to the federated-voting predicates.
    pub fn wire_message(&self) -> Option<Message> {
        match self.phase {
            BallotPhase::Prepare => {
                let b = self.b.as_ref()?;
                let (pn, px) = ballot_fields(&self.p);
                let (ppn, ppx) = ballot_fields(&self.p_prime);
                Some(Message::Prepare {
                    slot: self.slot,
                    bn: b.n,
                    bx: b.x.clone(),
                    pn,
                    px,
                    ppn,
                    ppx,
                    cn: self.c.as_ref().map_or(0, |c| c.n),
                    hn: self.h.as_ref().map_or(0, |h| h.n),
                    slice: self.slice.clone(),
                })
            }
            BallotPhase::Confirm => {
                let b = self.b.as_ref()?;
                let c = self.c.as_ref()?;
                let h = self.h.as_ref()?;
                Some(Message::Confirm {
                    slot: self.slot,
                    bn: b.n,
                    bx: b.x.clone(),
                    pn: self.p.as_ref().map_or(b.n, |p| p.n),
                    cn: c.n,
                    hn: h.n,
                    slice: self.slice.clone(),
                })
            }
            BallotPhase::Externalize => {
                let c = self.c.as_ref()?;
                let h = self.h.as_ref()?;
                Some(Message::Externalize {
                    slot: self.slot,
                    x: h.x.clone(),
                    cn: c.n,
                    hn: h.n,
                    slice: self.slice.clone(),
                })
            }
        }
    }

    /// Recompute everything derivable from the message set. Each step is
    /// monotone, so a single prepare -> confirm sweep per call converges.
    fn update(&mut self) {
        if self.b.is_none() {
            return;
        }
        self.update_prepared();
        if self.phase == BallotPhase::Prepare {
            self.adopt_prepared();
            self.maybe_vote_commit();
            self.maybe_accept_commit();
        }
        if self.phase == BallotPhase::Confirm {
            self.extend_accepted_commit();
            self.maybe_confirm_commit();
        }
        self.check_invariants();
    }

    /// Maintain p and pPrime: the two highest accepted-prepared ballots,
    /// pPrime carrying a different value than p.
    fn update_prepared(&mut self) {
        let mut accepted: Vec<Ballot> = self
            .candidate_prepared_ballots()
            .into_iter()
            .filter(|ballot| self.test_accept_prepare(ballot))
            .collect();
        accepted.sort_by(|a, b| b.cmp(a));

        let best = accepted.first().cloned();
        if let Some(best) = best {
            if self.p.as_ref().map_or(true, |p| best > *p) {
                debug!("accepted prepared ballot {}", best.n);
                self.p = Some(best.clone());
                self.dirty = true;
                // A stale pPrime may now share p's value; drop it
                if let Some(pp) = &self.p_prime {
                    if pp.compatible(self.p.as_ref().unwrap_or(&best)) {
                        self.p_prime = None;
                    }
                }
            }
            let second = accepted
                .iter()
                .find(|ballot| !ballot.compatible(self.p.as_ref().unwrap_or(&best)))
                .cloned();
            if let Some(second) = second {
                if self.p_prime.as_ref().map_or(true, |pp| second > *pp) {
                    self.p_prime = Some(second);
                    self.dirty = true;
                }
            }
        }
    }

    /// If a higher ballot is accepted prepared, move our ballot up to it.
    /// Abandoning an incompatible commit vote resets c.
    fn adopt_prepared(&mut self) {
        let (Some(b), Some(p)) = (&self.b, &self.p) else {
            return;
        };
        if p <= b {
            return;
        }
        let next = p.clone();
        if let Some(c) = &self.c {
            if !c.compatible(&next) {
                self.c = None;
                self.h = None;
            }
        }
        debug!("raising ballot to prepared {}", next.n);
        self.b = Some(next);
        self.dirty = true;
    }

    /// Vote to commit b once it is accepted prepared and no higher
    /// incompatible ballot is.
    fn maybe_vote_commit(&mut self) {
        let Some(b) = self.b.clone() else { return };
        if !self.test_accept_prepare(&b) {
            return;
        }
        let vetoed = [&self.p, &self.p_prime].into_iter().any(|other| {
            other
                .as_ref()
                .map_or(false, |o| *o > b && !o.compatible(&b))
        });
        if vetoed {
            return;
        }
        match &self.c {
            None => {
                debug!("voting to commit ballot {}", b.n);
                self.c = Some(b.clone());
                self.h = Some(b);
                self.dirty = true;
            }
            Some(c) if c.compatible(&b) => {
                if self.h.as_ref().map_or(true, |h| b > *h) {
                    self.h = Some(b);
                    self.dirty = true;
                }
            }
            Some(_) => {}
        }
    }

    /// Prepare -> Confirm once some ballot in the interval is accepted
    /// committed
    fn maybe_accept_commit(&mut self) {
        let Some(b) = self.b.clone() else { return };
        let x = b.x.clone();
        let accepted: Vec<u32> = self
            .commit_candidate_counters(&x)
            .into_iter()
            .filter(|n| self.test_accept_commit(*n, &x))
            .collect();
        let (Some(&low), Some(&high)) = (accepted.first(), accepted.last()) else {
            return;
        };

        info!("accepted commit {}..{} for slot {}", low, high, self.slot);
        self.phase = BallotPhase::Confirm;
        self.c = Some(Ballot::new(low, x.clone()));
        self.h = Some(Ballot::new(high, x.clone()));
        if b.n < high {
            self.b = Some(Ballot::new(high, x));
        }
        self.dirty = true;
    }

    /// Grow the accepted-commit interval as more counters are accepted
    fn extend_accepted_commit(&mut self) {
        let Some(h) = self.h.clone() else { return };
        let x = h.x.clone();
        let accepted: Vec<u32> = self
            .commit_candidate_counters(&x)
            .into_iter()
            .filter(|n| self.test_accept_commit(*n, &x))
            .collect();
        let (Some(&low), Some(&high)) = (accepted.first(), accepted.last()) else {
            return;
        };
        if self.c.as_ref().map_or(true, |c| low < c.n) {
            self.c = Some(Ballot::new(low, x.clone()));
            self.dirty = true;
        }
        if high > h.n {
            self.h = Some(Ballot::new(high, x.clone()));
            if self.b.as_ref().map_or(true, |b| b.n < high) {
                self.b = Some(Ballot::new(high, x));
            }
            self.dirty = true;
        }
    }

    /// Confirm -> Externalize once a quorum accepts the commit
    fn maybe_confirm_commit(&mut self) {
        let Some(h) = self.h.clone() else { return };
        let x = h.x.clone();
        let confirmed: Vec<u32> = self
            .commit_candidate_counters(&x)
            .into_iter()
            .filter(|n| self.test_confirm_commit(*n, &x))
            .collect();
        let (Some(&low), Some(&high)) = (confirmed.first(), confirmed.last()) else {
            return;
        };

        info!("externalizing slot {} at commit {}..{}", self.slot, low, high);
        self.phase = BallotPhase::Externalize;
        self.c = Some(Ballot::new(low, x.clone()));
        self.h = Some(Ballot::new(high, x));
        self.dirty = true;
    }

    // Candidate enumeration

    /// Every ballot any message mentions as prepared or preparable, plus
    /// our own
    fn candidate_prepared_ballots(&self) -> BTreeSet<Ballot> {
        let mut candidates = BTreeSet::new();
        if let Some(b) = &self.b {
            candidates.insert(b.clone());
        }
        for msg in self.m.values() {
            match msg {
                Message::Prepare {
                    bn, bx, pn, px, ppn, ppx, ..
                } => {
                    if *bn > 0 {
                        candidates.insert(Ballot::new(*bn, bx.clone()));
                    }
                    if *pn > 0 {
                        candidates.insert(Ballot::new(*pn, px.clone()));
                    }
                    if *ppn > 0 {
                        candidates.insert(Ballot::new(*ppn, ppx.clone()));
                    }
                }
                Message::Confirm { bn, bx, pn, .. } => {
                    candidates.insert(Ballot::new(*bn, bx.clone()));
                    if *pn > 0 {
                        candidates.insert(Ballot::new(*pn, bx.clone()));
                    }
                }
                Message::Externalize { x, cn, hn, .. } => {
                    if *cn > 0 {
                        candidates.insert(Ballot::new(*cn, x.clone()));
                    }
                    if *hn > 0 {
                        candidates.insert(Ballot::new(*hn, x.clone()));
                    }
                }
                Message::Nominate { .. } => {}
            }
        }
        candidates
    }

    /// Counters worth testing for commit acceptance on value x: every
    /// interval endpoint any message mentions, plus our own. The accepted
    /// region's extrema always lie on one of these.
    fn commit_candidate_counters(&self, x: &SlotValue) -> BTreeSet<u32> {
        let mut counters = BTreeSet::new();
        for ballot in [&self.b, &self.c, &self.h].into_iter().flatten() {
            if ballot.x == *x {
                counters.insert(ballot.n);
            }
        }
        for msg in self.m.values() {
            match msg {
                Message::Prepare { bx, cn, hn, .. } if bx == x => {
                    if *cn > 0 {
                        counters.insert(*cn);
                        counters.insert(*hn);
                    }
                }
                Message::Confirm { bx, bn, cn, hn, .. } if bx == x => {
                    counters.insert(*bn);
                    counters.insert(*cn);
                    counters.insert(*hn);
                }
                Message::Externalize { x: mx, cn, hn, .. } if mx == x => {
                    counters.insert(*cn);
                    counters.insert(*hn);
                }
                _ => {}
            }
        }
        counters.remove(&0);
        counters
    }

    // Federated-voting predicates

    fn peer_slices(&self) -> BTreeMap<Address, QuorumSlice> {
        self.m
            .iter()
            .map(|(peer, msg)| (peer.clone(), msg.slice().clone()))
            .collect()
    }

    fn node_message(&self, node: &Address) -> Option<Message> {
        if *node == self.me {
            self.wire_message()
        } else {
            self.m.get(node).cloned()
        }
    }

    fn test_accept_prepare(&self, ballot: &Ballot) -> bool {
        let peer_slices = self.peer_slices();
        slice::accept(
            &self.me,
            &self.slice,
            &peer_slices,
            |node| {
                self.node_message(node)
                    .map_or(false, |msg| votes_or_accepts_prepare(&msg, ballot))
            },
            |node| {
                self.node_message(node)
                    .map_or(false, |msg| accepts_prepare(&msg, ballot))
            },
        )
    }

    fn test_accept_commit(&self, n: u32, x: &SlotValue) -> bool {
        let peer_slices = self.peer_slices();
        slice::accept(
            &self.me,
            &self.slice,
            &peer_slices,
            |node| {
                self.node_message(node)
                    .map_or(false, |msg| votes_or_accepts_commit(&msg, n, x))
            },
            |node| {
                self.node_message(node)
                    .map_or(false, |msg| accepts_commit(&msg, n, x))
            },
        )
    }

    fn test_confirm_commit(&self, n: u32, x: &SlotValue) -> bool {
        let peer_slices = self.peer_slices();
        slice::confirm(&self.me, &self.slice, &peer_slices, |node| {
            self.node_message(node)
                .map_or(false, |msg| accepts_commit(&msg, n, x))
        })
    }

    fn check_invariants(&self) {
        if let (Some(c), Some(h), Some(b)) = (&self.c, &self.h, &self.b) {
            debug_assert!(c <= h, "commit interval inverted");
            debug_assert!(h <= b, "commit interval above current ballot");
        }
        if let (Some(p), Some(pp)) = (&self.p, &self.p_prime) {
            debug_assert!(pp < p, "pPrime must stay below p");
            debug_assert!(!pp.compatible(p), "pPrime must carry a different value");
        }
    }
}

// Statement semantics of the three ballot message kinds.
//
// A Prepare with ballot b votes prepare(B) for every B <= b carrying the
// same value (aborting below B is implied by aborting below b), and
// accepts prepare up to its p / pPrime. A Confirm accepts prepare up to
// its pn and commit across its cn..hn, and keeps voting commit above. An
// Externalize accepts commit for everything at or above its cn.

fn votes_or_accepts_prepare(msg: &Message, ballot: &Ballot) -> bool {
    match msg {
        Message::Prepare { bn, bx, .. } => {
            (*bn >= ballot.n && *bx == ballot.x) || accepts_prepare(msg, ballot)
        }
        _ => accepts_prepare(msg, ballot),
    }
}

fn accepts_prepare(msg: &Message, ballot: &Ballot) -> bool {
    match msg {
        Message::Prepare {
            pn, px, ppn, ppx, ..
        } => {
            (*pn >= ballot.n && *px == ballot.x) || (*ppn >= ballot.n && *ppx == ballot.x)
        }
        Message::Confirm { bx, pn, .. } => *bx == ballot.x && *pn >= ballot.n,
        Message::Externalize { x, .. } => *x == ballot.x,
        Message::Nominate { .. } => false,
    }
}

fn votes_or_accepts_commit(msg: &Message, n: u32, x: &SlotValue) -> bool {
    match msg {
        Message::Prepare { bx, cn, hn, .. } => *cn != 0 && bx == x && *cn <= n && n <= *hn,
        Message::Confirm { bx, cn, .. } => bx == x && n >= *cn,
        Message::Externalize { x: mx, cn, .. } => mx == x && n >= *cn,
        Message::Nominate { .. } => false,
    }
}

fn accepts_commit(msg: &Message, n: u32, x: &SlotValue) -> bool {
    match msg {
        Message::Confirm { bx, cn, hn, .. } => bx == x && *cn <= n && n <= *hn,
        Message::Externalize { x: mx, cn, .. } => mx == x && n >= *cn,
        _ => false,
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
            to: Address::from("0100000000000000000000000000000000000000000000000000000000000000"),
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

    fn state() -> BallotState {
        BallotState::new(addr("v"), four_node_slice(), 1)
    }

    fn prepare(bn: u32, x: &SlotValue, pn: u32, cn: u32, hn: u32) -> Message {
        Message::Prepare {
            slot: 1,
            bn,
            bx: x.clone(),
            pn,
            px: if pn > 0 { x.clone() } else { SlotValue::empty() },
            ppn: 0,
            ppx: SlotValue::empty(),
            cn,
            hn,
            slice: four_node_slice(),
        }
    }

    fn confirm_msg(bn: u32, x: &SlotValue, cn: u32, hn: u32) -> Message {
        Message::Confirm {
            slot: 1,
            bn,
            bx: x.clone(),
            pn: bn,
            cn,
            hn,
            slice: four_node_slice(),
        }
    }

    #[test]
    fn test_starts_at_ballot_one() {
        let mut s = state();
        s.maybe_start(value(1));
        assert_eq!(s.ballot_counter(), Some(1));
        match s.take_message().unwrap() {
            Message::Prepare { bn, cn, .. } => {
                assert_eq!(bn, 1);
                assert_eq!(cn, 0);
            }
            _ => panic!("expected prepare"),
        }
    }

    #[test]
    fn test_prepare_accepted_with_quorum() {
        let mut s = state();
        let v = value(1);
        s.maybe_start(v.clone());
        s.handle(addr("a"), prepare(1, &v, 0, 0, 0)).unwrap();
        s.handle(addr("b"), prepare(1, &v, 0, 0, 0)).unwrap();

        // Quorum votes prepare(1, v): we should now vote to commit
        match s.take_message().unwrap() {
            Message::Prepare { pn, cn, hn, .. } => {
                assert_eq!(pn, 1);
                assert_eq!(cn, 1);
                assert_eq!(hn, 1);
            }
            _ => panic!("expected prepare"),
        }
        assert_eq!(s.phase(), BallotPhase::Prepare);
    }

    #[test]
    fn test_accept_commit_moves_to_confirm() {
        let mut s = state();
        let v = value(1);
        s.maybe_start(v.clone());
        // Peers already prepared and voting commit
        s.handle(addr("a"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("b"), prepare(1, &v, 1, 1, 1)).unwrap();

        assert_eq!(s.phase(), BallotPhase::Confirm);
        match s.take_message().unwrap() {
            Message::Confirm { bn, cn, hn, .. } => {
                assert_eq!((bn, cn, hn), (1, 1, 1));
            }
            _ => panic!("expected confirm"),
        }
    }

    #[test]
    fn test_confirm_commit_externalizes() {
        let mut s = state();
        let v = value(1);
        s.maybe_start(v.clone());
        s.handle(addr("a"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("b"), prepare(1, &v, 1, 1, 1)).unwrap();
        assert_eq!(s.phase(), BallotPhase::Confirm);

        s.handle(addr("a"), confirm_msg(1, &v, 1, 1)).unwrap();
        s.handle(addr("b"), confirm_msg(1, &v, 1, 1)).unwrap();

        assert_eq!(s.phase(), BallotPhase::Externalize);
        let (x, cn, hn) = s.externalized().unwrap();
        assert_eq!(x, v);
        assert_eq!((cn, hn), (1, 1));
        match s.take_message().unwrap() {
            Message::Externalize { x, .. } => assert_eq!(x, v),
            _ => panic!("expected externalize"),
        }
    }

    #[test]
    fn test_externalized_value_is_final() {
        let mut s = state();
        let v = value(1);
        let other = value(2);
        s.maybe_start(v.clone());
        s.handle(addr("a"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("b"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("a"), confirm_msg(1, &v, 1, 1)).unwrap();
        s.handle(addr("b"), confirm_msg(1, &v, 1, 1)).unwrap();
        assert_eq!(s.phase(), BallotPhase::Externalize);

        // Late messages for a different value change nothing
        s.handle(addr("c"), prepare(9, &other, 9, 9, 9)).unwrap();
        s.handle(addr("a"), confirm_msg(9, &other, 9, 9)).unwrap();
        let (x, _, _) = s.externalized().unwrap();
        assert_eq!(x, v);
        assert_eq!(s.phase(), BallotPhase::Externalize);
    }

    #[test]
    fn test_adopts_higher_prepared_ballot() {
        let mut s = state();
        let v = value(1);
        s.maybe_start(v.clone());
        // A blocking set has accepted prepare on a higher ballot
        s.handle(addr("a"), prepare(3, &v, 3, 0, 0)).unwrap();
        s.handle(addr("b"), prepare(3, &v, 3, 0, 0)).unwrap();

        assert!(s.ballot_counter().unwrap() >= 3);
    }

    #[test]
    fn test_bump_escalates_counter() {
        let mut s = state();
        s.maybe_start(value(1));
        let _ = s.take_message();
        s.bump();
        assert_eq!(s.ballot_counter(), Some(2));
        match s.take_message().unwrap() {
            Message::Prepare { bn, .. } => assert_eq!(bn, 2),
            _ => panic!("expected prepare"),
        }
    }

    #[test]
    fn test_bump_after_externalize_is_noop() {
        let mut s = state();
        let v = value(1);
        s.maybe_start(v.clone());
        s.handle(addr("a"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("b"), prepare(1, &v, 1, 1, 1)).unwrap();
        s.handle(addr("a"), confirm_msg(1, &v, 1, 1)).unwrap();
        s.handle(addr("b"), confirm_msg(1, &v, 1, 1)).unwrap();

        let before = s.externalized();
        s.bump();
        assert_eq!(s.externalized(), before);
    }

    #[test]
    fn test_nominate_rejected() {
        let mut s = state();
        let msg = Message::Nominate {
            slot: 1,
            voted: vec![],
            accepted: vec![],
            slice: four_node_slice(),
        };
        assert!(matches!(
            s.handle(addr("a"), msg),
            Err(ConsensusError::UnexpectedMessage)
        ));
    }

    #[test]
    fn test_wrong_slot_rejected() {
        let mut s = state();
        let msg = prepare(1, &value(1), 0, 0, 0);
        let msg = match msg {
            Message::Prepare { bn, bx, pn, px, ppn, ppx, cn, hn, slice, .. } => Message::Prepare {
                slot: 7,
                bn, bx, pn, px, ppn, ppx, cn, hn, slice,
            },
            _ => unreachable!(),
        };
        assert!(matches!(
            s.handle(addr("a"), msg),
            Err(ConsensusError::WrongSlot { expected: 1, got: 7 })
        ));
    }
}

use std::collections::{BTreeMap, BTreeSet};

use aureus_core::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

/// A quorum slice: any `threshold` of `members` convinces the local node.
/// Typically includes the node itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumSlice {
    #[serde(rename = "Members")]
    pub members: Vec<Address>,
    #[serde(rename = "Threshold")]
    pub threshold: u16,
}

impl QuorumSlice {
    pub fn new(members: Vec<Address>, threshold: u16) -> Result<Self, ConsensusError> {
        let slice = QuorumSlice { members, threshold };
        if !slice.is_well_formed() {
            return Err(ConsensusError::MalformedSlice {
                threshold: slice.threshold,
                members: slice.members.len(),
            });
        }
        Ok(slice)
    }

    /// 1 <= threshold <= |members|
    pub fn is_well_formed(&self) -> bool {
        self.threshold >= 1 && (self.threshold as usize) <= self.members.len()
    }

    /// A node set satisfies the slice when it covers the threshold
    pub fn satisfied_by(&self, nodes: &BTreeSet<Address>) -> bool {
        let count = self.members.iter().filter(|m| nodes.contains(*m)).count();
        count >= self.threshold as usize
    }

    /// A node set blocks the slice when the remaining members cannot reach
    /// the threshold without it, i.e. the set intersects every satisfying
    /// subset.
    pub fn blocked_by(&self, nodes: &BTreeSet<Address>) -> bool {
        let outside = self.members.iter().filter(|m| !nodes.contains(*m)).count();
        outside < self.threshold as usize
    }
}

/// Search for a quorum asserting a statement: a set containing the local
/// node in which every member's slice is satisfied by the set itself.
/// Starts from everyone asserting the statement and prunes nodes whose
/// slice the remainder cannot satisfy (greatest fixpoint).
pub fn find_quorum<F>(
    me: &Address,
    my_slice: &QuorumSlice,
    peer_slices: &BTreeMap<Address, QuorumSlice>,
    asserts: F,
) -> bool
where
    F: Fn(&Address) -> bool,
{
    if !asserts(me) {
        return false;
    }
    let mut set: BTreeSet<Address> = peer_slices
        .keys()
        .filter(|node| asserts(node))
        .cloned()
        .collect();
    set.insert(me.clone());

    loop {
        let pruned: BTreeSet<Address> = set
            .iter()
            .filter(|node| {
                let slice = if *node == me {
                    my_slice
                } else {
                    match peer_slices.get(*node) {
                        Some(s) => s,
                        None => return false,
                    }
                };
                slice.satisfied_by(&set)
            })
            .cloned()
            .collect();
        if pruned.len() == set.len() {
            break;
        }
        set = pruned;
    }
    set.contains(me)
}

/// The federated accept predicate: either a quorum has voted-or-accepted
/// the statement, or a blocking set has accepted it (which lets a node
/// accept past its own vote).
pub fn accept<F, G>(
    me: &Address,
    my_slice: &QuorumSlice,
    peer_slices: &BTreeMap<Address, QuorumSlice>,
    voted_or_accepted: F,
    accepted: G,
) -> bool
where
    F: Fn(&Address) -> bool,
    G: Fn(&Address) -> bool,
{
    let accepters: BTreeSet<Address> = peer_slices
        .keys()
        .filter(|node| accepted(node))
        .cloned()
        .collect();
    if my_slice.blocked_by(&accepters) {
        return true;
    }
    find_quorum(me, my_slice, peer_slices, voted_or_accepted)
}

/// The federated confirm predicate: a quorum has accepted the statement
pub fn confirm<F>(
    me: &Address,
    my_slice: &QuorumSlice,
    peer_slices: &BTreeMap<Address, QuorumSlice>,
    accepted: F,
) -> bool
where
    F: Fn(&Address) -> bool,
{
    find_quorum(me, my_slice, peer_slices, accepted)
}

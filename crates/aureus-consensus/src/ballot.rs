use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::value::SlotValue;

/// A ballot: a counter plus the value it proposes. The counter starts at 1
/// so there is always room for a higher ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub n: u32,
    pub x: SlotValue,
}

impl Ballot {
    pub fn new(n: u32, x: SlotValue) -> Self {
        Ballot { n, x }
    }

    /// Ballots are compatible when they carry the same value
    pub fn compatible(&self, other: &Ballot) -> bool {
        self.x == other.x
    }
}

/// Lexicographic on (n, canonical bytes of x). Canonical-byte comparison
/// of values makes the order total, so no two ballots are incomparable.
impl Ord for Ballot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.n.cmp(&other.n).then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for Ballot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aureus_core::{Address, KeyPair, Operation, SecretKey, SignedOperation};

    fn value(n: u64) -> SlotValue {
        let kp = KeyPair::from_secret(SecretKey::from_bytes(&[n as u8; 32]));
        let op = Operation::Send {
            signer: Address::from_public_key(&kp.public),
            sequence: 1,
            fee: n,
            to: Address::from("e000000000000000000000000000000000000000000000000000000000000000"),
            amount: n,
        };
        SlotValue::new(vec![SignedOperation::sign(op, &kp).unwrap()])
    }

    #[test]
    fn test_counter_dominates() {
        let low = Ballot::new(1, value(2));
        let high = Ballot::new(2, value(1));
        assert!(low < high);
    }

    #[test]
    fn test_same_counter_ordered_by_value() {
        let a = Ballot::new(1, value(1));
        let b = Ballot::new(1, value(2));
        assert!(a != b);
        assert!((a < b) != (b < a));
    }

    #[test]
    fn test_compatible() {
        let a = Ballot::new(1, value(1));
        let b = Ballot::new(5, value(1));
        let c = Ballot::new(5, value(2));
        assert!(a.compatible(&b));
        assert!(!b.compatible(&c));
    }
}

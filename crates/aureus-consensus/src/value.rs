use std::cmp::Ordering;

use aureus_core::{canonical_json, SignedOperation};
use serde::{Deserialize, Serialize};

/// The value a slot decides on: an ordered, deduplicated set of signed
/// operations. Two values combine commutatively by sorted-dedup union, and
/// equality and ordering are by canonical serialization, which keeps the
/// ballot order total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SignedOperation>", into = "Vec<SignedOperation>")]
pub struct SlotValue {
    operations: Vec<SignedOperation>,
}

impl SlotValue {
    pub fn new(operations: Vec<SignedOperation>) -> Self {
        let mut keyed: Vec<(Vec<u8>, SignedOperation)> = operations
            .into_iter()
            .map(|op| (op.canonical_bytes().unwrap_or_default(), op))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);
        SlotValue {
            operations: keyed.into_iter().map(|(_, op)| op).collect(),
        }
    }

    pub fn empty() -> Self {
        SlotValue::default()
    }

    /// Sorted-dedup union of two values
    pub fn combine(&self, other: &SlotValue) -> SlotValue {
        let mut operations = self.operations.clone();
        operations.extend(other.operations.iter().cloned());
        SlotValue::new(operations)
    }

    /// Combine any number of values
    pub fn combine_all<'a, I>(values: I) -> SlotValue
    where
        I: IntoIterator<Item = &'a SlotValue>,
    {
        values
            .into_iter()
            .fold(SlotValue::empty(), |acc, v| acc.combine(v))
    }

    pub fn operations(&self) -> &[SignedOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The canonical byte form, used for ordering and ballot comparison.
    /// Serialization of an in-memory value cannot fail; an empty fallback
    /// keeps ordering total regardless.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json(&self.operations).unwrap_or_default()
    }
}

impl From<Vec<SignedOperation>> for SlotValue {
    fn from(operations: Vec<SignedOperation>) -> Self {
        SlotValue::new(operations)
    }
}

impl From<SlotValue> for Vec<SignedOperation> {
    fn from(value: SlotValue) -> Self {
        value.operations
    }
}

impl Ord for SlotValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_bytes().cmp(&other.canonical_bytes())
    }
}

impl PartialOrd for SlotValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

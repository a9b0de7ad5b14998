use aureus_core::{hash_sha3, Address, Hash};

/// Sort node IDs in an order that is repeatable given the seed string.
/// Each node is keyed by `SHA3-512(seed || node)` and the keys are sorted
/// ascending. Pure; does not mutate its input.
pub fn seed_sort(seed: &str, nodes: &[Address]) -> Vec<Address> {
    let mut keyed: Vec<(Hash, Address)> = nodes
        .iter()
        .map(|node| {
            let mut input = Vec::with_capacity(seed.len() + node.as_bytes().len());
            input.extend_from_slice(seed.as_bytes());
            input.extend_from_slice(node.as_bytes());
            (hash_sha3(&input), node.clone())
        })
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, node)| node).collect()
}

/// The index of `node` in the seed-sorted list, or None if absent
pub fn seed_priority(seed: &str, nodes: &[Address], node: &Address) -> Option<usize> {
    seed_sort(seed, nodes).iter().position(|n| n == node)
}

/// The seed string used to pick the nomination leader for a round of a
/// slot. The previous chunk's hash salts the ordering so each ledger state
/// feeds the next slot's priorities.
pub fn leader_seed(slot: u64, round: u32, prev_chunk: &Hash) -> String {
    format!("slot:{}:round:{}:{}", slot, round, prev_chunk.to_hex())
}

//! Aureus Consensus - Federated voting over a sequence of slots
//!
//! This crate implements a Stellar-Consensus-Protocol-style engine: a
//! nomination protocol that converges on a candidate value per slot, a
//! three-phase ballot protocol (Prepare / Confirm / Externalize) that
//! commits it, and a slot builder that turns externalized values into
//! ledger chunks.

pub mod ballot;
pub mod ballot_state;
pub mod error;
pub mod message;
pub mod nomination;
pub mod seed;
pub mod slice;
pub mod slot;
pub mod value;

pub use ballot::Ballot;
pub use ballot_state::{BallotPhase, BallotState};
pub use error::ConsensusError;
pub use message::{Message, SignedMessage};
pub use nomination::NominationState;
pub use seed::{leader_seed, seed_priority, seed_sort};
pub use slice::QuorumSlice;
pub use slot::SlotBuilder;
pub use value::SlotValue;

//! Aureus Node - the single-threaded cooperative state machine
//!
//! All consensus and ledger state transitions are driven by one event
//! channel: peer messages, local submissions, and timer ticks. The node
//! owns the queue, the account store, the chunk store, and the slot
//! builder; outbound messages go to a non-blocking channel owned by the
//! transport collaborator.

pub mod config;
pub mod node;

pub use config::{generate_sample_config, NodeConfig};
pub use node::{Event, Node};

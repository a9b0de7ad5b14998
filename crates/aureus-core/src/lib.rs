//! Aureus Core - Core types, cryptography, and canonical serialization
//!
//! This crate provides the foundational types and utilities for the Aureus
//! federated-voting currency.

pub mod crypto;
pub mod error;
pub mod serialize;
pub mod types;

pub use crypto::{hash_sha3, sign, verify, Hash, KeyPair, PublicKey, SecretKey, Sig};
pub use error::CoreError;
pub use serialize::{canonical_json, from_json, from_json_bytes, to_json, to_json_pretty};
pub use types::*;

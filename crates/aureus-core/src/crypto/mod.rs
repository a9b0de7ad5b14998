pub mod hash;
pub mod keys;
pub mod signature;

pub use hash::{hash_sha3, Hash};
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use signature::{sign, verify, Sig};

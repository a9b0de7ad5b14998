use ed25519_dalek::{Signature as DalekSignature, Signer, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;

use crate::crypto::keys::{PublicKey, SecretKey};

/// An ed25519 signature over canonical bytes.
///
/// The default all-zero value is the placeholder of an unsigned
/// envelope; it never verifies, so an operation or message that skipped
/// signing is rejected like any forgery.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig(#[serde(with = "BigArray")] [u8; 64]);

impl Sig {
    /// Whether this is the unsigned placeholder
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 64]
    }
}

impl Default for Sig {
    fn default() -> Self {
        Sig([0u8; 64])
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &hex::encode(self.0)[..16])
    }
}

/// Sign canonical bytes with a secret key
pub fn sign(secret_key: &SecretKey, message: &[u8]) -> Sig {
    let signature = secret_key.signing_key().sign(message);
    Sig(signature.to_bytes())
}

/// Check a signature over canonical bytes. Peer input can be arbitrary,
/// so every failure (unsigned placeholder, undecodable key, mismatch)
/// is just `false`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Sig) -> bool {
    if signature.is_zero() {
        return false;
    }
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = DalekSignature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

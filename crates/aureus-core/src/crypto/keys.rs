use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::fmt;

use crate::error::CoreError;
use crate::types::address::Address;

/// An ed25519 public key. On the wire and in the ledger it only ever
/// appears as its derived [`Address`]; the raw key exists to verify
/// signatures and nothing else.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub(crate) [u8; 32]);

impl PublicKey {
    /// The ledger address derived from this key: its lowercase hex form.
    /// This is the only representation the rest of the system sees.
    pub fn address(&self) -> Address {
        Address::from(hex::encode(self.0))
    }

    /// Recover a key from an address-style hex string
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(PublicKey(bytes))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// An ed25519 secret key. Not serializable, and Debug is redacted, to
/// keep it out of logs and config dumps; the hex form exists only for
/// the `node_secret` config field and the keygen CLI.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a new random secret key
    pub fn generate() -> Self {
        SecretKey(SigningKey::generate(&mut OsRng))
    }

    /// Rebuild a key from its 32-byte seed
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        SecretKey(SigningKey::from_bytes(bytes))
    }

    /// Parse the config-file form (seed hex)
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Export the config-file form (use with caution)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// The corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// A node's or account holder's keypair
#[derive(Clone)]
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::generate())
    }

    /// Build the pair a secret key implies; this is how a node comes up
    /// from its configured `node_secret`.
    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        KeyPair { secret, public }
    }

    /// The address this keypair signs for
    pub fn address(&self) -> Address {
        self.public.address()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

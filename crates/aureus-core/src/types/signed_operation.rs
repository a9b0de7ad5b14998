use serde::{Deserialize, Serialize};

use crate::crypto::{hash_sha3, sign, verify, Hash, KeyPair, Sig};
use crate::error::CoreError;
use crate::serialize::canonical_json;
use crate::types::operation::Operation;

/// An operation plus the signer's signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOperation {
    pub operation: Operation,
    pub signature: Sig,
}

impl SignedOperation {
    /// Sign an operation. Fails if the keypair does not match the
    /// operation's signer.
    pub fn sign(operation: Operation, keypair: &KeyPair) -> Result<Self, CoreError> {
        let signer = operation.signer().public_key()?;
        if signer != keypair.public {
            return Err(CoreError::InvalidAddress(operation.signer().to_string()));
        }
        let bytes = canonical_json(&operation)?;
        let signature = sign(&keypair.secret, &bytes);
        Ok(SignedOperation {
            operation,
            signature,
        })
    }

    /// Verify the signature and the operation's structural validity.
    /// Peer input can be arbitrary, so every failure branch is `false`.
    pub fn verify(&self) -> bool {
        if !self.operation.validate() {
            return false;
        }
        let public_key = match self.operation.signer().public_key() {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let bytes = match canonical_json(&self.operation) {
            Ok(b) => b,
            Err(_) => return false,
        };
        verify(&public_key, &bytes, &self.signature)
    }

    /// Canonical bytes of the whole signed operation, its identity for
    /// queue dedup and slot-value ordering.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        canonical_json(self)
    }

    /// SHA3-512 fingerprint of the canonical bytes
    pub fn fingerprint(&self) -> Result<Hash, CoreError> {
        Ok(hash_sha3(&self.canonical_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::address::Address;

    fn make_send(keypair: &KeyPair, sequence: u32, amount: u64) -> Operation {
        Operation::Send {
            signer: Address::from_public_key(&keypair.public),
            sequence,
            fee: 1,
            to: Address::from_public_key(&KeyPair::generate().public),
            amount,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let signed = SignedOperation::sign(make_send(&kp, 1, 100), &kp).unwrap();
        assert!(signed.verify());
    }

    #[test]
    fn test_sign_wrong_keypair() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        assert!(SignedOperation::sign(make_send(&kp, 1, 100), &other).is_err());
    }

    #[test]
    fn test_tampered_operation_fails() {
        let kp = KeyPair::generate();
        let mut signed = SignedOperation::sign(make_send(&kp, 1, 100), &kp).unwrap();
        if let Operation::Send { amount, .. } = &mut signed.operation {
            *amount = 999;
        }
        assert!(!signed.verify());
    }

    #[test]
    fn test_unsigned_fails() {
        let kp = KeyPair::generate();
        let unsigned = SignedOperation {
            operation: make_send(&kp, 1, 100),
            signature: Sig::default(),
        };
        assert!(!unsigned.verify());
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let kp = KeyPair::generate();
        let signed = SignedOperation::sign(make_send(&kp, 1, 100), &kp).unwrap();
        assert_eq!(signed.fingerprint().unwrap(), signed.fingerprint().unwrap());
    }

    #[test]
    fn test_wire_roundtrip() {
        let kp = KeyPair::generate();
        let signed = SignedOperation::sign(make_send(&kp, 1, 100), &kp).unwrap();
        let bytes = signed.canonical_bytes().unwrap();
        let recovered: SignedOperation = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(signed, recovered);
        assert!(recovered.verify());
    }
}

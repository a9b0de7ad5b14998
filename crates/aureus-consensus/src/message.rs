use aureus_core::{canonical_json, sign, verify, Address, KeyPair, Sig};
use serde::{Deserialize, Serialize};

use crate::ballot::Ballot;
use crate::error::ConsensusError;
use crate::slice::QuorumSlice;
use crate::value::SlotValue;

/// Wire messages of the consensus protocol, one per protocol stage.
/// Serialized as canonical JSON with the variant name in the
/// `MessageType` tag. Absent ballots encode as counter 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "MessageType")]
pub enum Message {
    Nominate {
        #[serde(rename = "I")]
        slot: u64,
        /// Values we have voted to nominate
        #[serde(rename = "X")]
        voted: Vec<SlotValue>,
        /// Values we have accepted as nominated
        #[serde(rename = "Y")]
        accepted: Vec<SlotValue>,
        #[serde(rename = "D")]
        slice: QuorumSlice,
    },
    Prepare {
        #[serde(rename = "I")]
        slot: u64,
        /// The ballot we are trying to prepare
        #[serde(rename = "Bn")]
        bn: u32,
        #[serde(rename = "Bx")]
        bx: SlotValue,
        /// Highest accepted-prepared ballot
        #[serde(rename = "Pn")]
        pn: u32,
        #[serde(rename = "Px")]
        px: SlotValue,
        /// Next-highest accepted-prepared ballot with a different value
        #[serde(rename = "Ppn")]
        ppn: u32,
        #[serde(rename = "Ppx")]
        ppx: SlotValue,
        /// Interval we are voting to commit
        #[serde(rename = "Cn")]
        cn: u32,
        #[serde(rename = "Hn")]
        hn: u32,
        #[serde(rename = "D")]
        slice: QuorumSlice,
    },
    Confirm {
        #[serde(rename = "I")]
        slot: u64,
        #[serde(rename = "Bn")]
        bn: u32,
        #[serde(rename = "Bx")]
        bx: SlotValue,
        #[serde(rename = "Pn")]
        pn: u32,
        /// Interval we have accepted committed
        #[serde(rename = "Cn")]
        cn: u32,
        #[serde(rename = "Hn")]
        hn: u32,
        #[serde(rename = "D")]
        slice: QuorumSlice,
    },
    Externalize {
        #[serde(rename = "I")]
        slot: u64,
        /// The value decided at this slot
        #[serde(rename = "X")]
        x: SlotValue,
        #[serde(rename = "Cn")]
        cn: u32,
        #[serde(rename = "Hn")]
        hn: u32,
        #[serde(rename = "D")]
        slice: QuorumSlice,
    },
}

impl Message {
    pub fn slot(&self) -> u64 {
        match self {
            Message::Nominate { slot, .. }
            | Message::Prepare { slot, .. }
            | Message::Confirm { slot, .. }
            | Message::Externalize { slot, .. } => *slot,
        }
    }

    pub fn slice(&self) -> &QuorumSlice {
        match self {
            Message::Nominate { slice, .. }
            | Message::Prepare { slice, .. }
            | Message::Confirm { slice, .. }
            | Message::Externalize { slice, .. } => slice,
        }
    }

    pub fn is_nominate(&self) -> bool {
        matches!(self, Message::Nominate { .. })
    }

    pub fn is_ballot(&self) -> bool {
        !self.is_nominate()
    }

    /// Structural validity of the message itself; slot-window checks
    /// belong to the receiver.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if !self.slice().is_well_formed() {
            return Err(ConsensusError::MalformedSlice {
                threshold: self.slice().threshold,
                members: self.slice().members.len(),
            });
        }
        Ok(())
    }
}

/// Encode an optional ballot as wire fields; absent is counter 0
pub(crate) fn ballot_fields(ballot: &Option<Ballot>) -> (u32, SlotValue) {
    match ballot {
        Some(b) => (b.n, b.x.clone()),
        None => (0, SlotValue::empty()),
    }
}

/// A message plus its sender's signature over the canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: Message,
    pub signer: Address,
    pub signature: Sig,
}

impl SignedMessage {
    pub fn sign(message: Message, keypair: &KeyPair) -> Result<Self, ConsensusError> {
        let bytes = canonical_json(&message)?;
        Ok(SignedMessage {
            message,
            signer: keypair.address(),
            signature: sign(&keypair.secret, &bytes),
        })
    }

    /// Peer input can be arbitrary; every failure branch is `false`
    pub fn verify(&self) -> bool {
        let public_key = match self.signer.public_key() {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let bytes = match canonical_json(&self.message) {
            Ok(b) => b,
            Err(_) => return false,
        };
        verify(&public_key, &bytes, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_slice() -> QuorumSlice {
        QuorumSlice::new(vec![Address::from("a"), Address::from("b")], 2).unwrap()
    }

    fn nominate() -> Message {
        Message::Nominate {
            slot: 3,
            voted: vec![SlotValue::empty()],
            accepted: vec![],
            slice: test_slice(),
        }
    }

    #[test]
    fn test_wire_tag() {
        let bytes = canonical_json(&nominate()).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.contains(r#""MessageType":"Nominate""#));
        assert!(s.contains(r#""I":3"#));
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        let messages = vec![
            nominate(),
            Message::Prepare {
                slot: 1,
                bn: 1,
                bx: SlotValue::empty(),
                pn: 0,
                px: SlotValue::empty(),
                ppn: 0,
                ppx: SlotValue::empty(),
                cn: 0,
                hn: 0,
                slice: test_slice(),
            },
            Message::Confirm {
                slot: 1,
                bn: 2,
                bx: SlotValue::empty(),
                pn: 2,
                cn: 1,
                hn: 2,
                slice: test_slice(),
            },
            Message::Externalize {
                slot: 1,
                x: SlotValue::empty(),
                cn: 1,
                hn: 2,
                slice: test_slice(),
            },
        ];
        for message in messages {
            let bytes = canonical_json(&message).unwrap();
            let recovered: Message = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(message, recovered);
        }
    }

    #[test]
    fn test_malformed_slice_rejected() {
        let message = Message::Nominate {
            slot: 1,
            voted: vec![],
            accepted: vec![],
            slice: QuorumSlice {
                members: vec![Address::from("a")],
                threshold: 5,
            },
        };
        assert!(message.validate().is_err());
    }

    #[test]
    fn test_signed_message_roundtrip() {
        let kp = KeyPair::generate();
        let signed = SignedMessage::sign(nominate(), &kp).unwrap();
        assert!(signed.verify());

        let bytes = canonical_json(&signed).unwrap();
        let recovered: SignedMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(signed, recovered);
        assert!(recovered.verify());
    }

    #[test]
    fn test_tampered_message_fails() {
        let kp = KeyPair::generate();
        let mut signed = SignedMessage::sign(nominate(), &kp).unwrap();
        if let Message::Nominate { slot, .. } = &mut signed.message {
            *slot = 99;
        }
        assert!(!signed.verify());
    }

    #[test]
    fn test_wrong_signer_fails() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let mut signed = SignedMessage::sign(nominate(), &kp).unwrap();
        signed.signer = Address::from_public_key(&other.public);
        assert!(!signed.verify());
    }
}

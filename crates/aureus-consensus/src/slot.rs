use aureus_core::{Address, Hash};
use aureus_ledger::{AccountStore, LedgerChunk};
use tracing::{debug, info};

use crate::ballot_state::{BallotPhase, BallotState};
use crate::error::ConsensusError;
use crate::message::Message;
use crate::nomination::NominationState;
use crate::seed::leader_seed;
use crate::slice::QuorumSlice;
use crate::value::SlotValue;

/// Drives one slot at a time from nomination through externalization.
///
/// Nomination and ballot state are fresh per slot and discarded once the
/// slot externalizes; the chunk hash of each slot salts the next slot's
/// leader ordering. Nomination messages for the next slot are buffered
/// until the current one finishes; ballot messages for finished slots are
/// ignored.
pub struct SlotBuilder {
    me: Address,
    slice: QuorumSlice,
    slot: u64,
    prev_chunk_hash: Hash,
    nomination: NominationState,
    ballot: BallotState,
    buffered: Vec<(Address, Message)>,
}

impl SlotBuilder {
    pub fn new(me: Address, slice: QuorumSlice, start_slot: u64, prev_chunk_hash: Hash) -> Self {
        let seed = leader_seed(start_slot, 0, &prev_chunk_hash);
        SlotBuilder {
            nomination: NominationState::new(me.clone(), slice.clone(), start_slot, seed),
            ballot: BallotState::new(me.clone(), slice.clone(), start_slot),
            me,
            slice,
            slot: start_slot,
            prev_chunk_hash,
            buffered: Vec::new(),
        }
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn phase(&self) -> BallotPhase {
        self.ballot.phase()
    }

    pub fn ballot_counter(&self) -> Option<u32> {
        self.ballot.ballot_counter()
    }

    /// A small fingerprint of forward progress, for the escalation timer
    pub fn progress(&self) -> (u64, BallotPhase, Option<u32>) {
        (self.slot, self.ballot.phase(), self.ballot.ballot_counter())
    }

    /// Offer a local candidate value for the current slot
    pub fn propose(&mut self, value: SlotValue) {
        if value.is_empty() {
            return;
        }
        self.nomination.set_default(value);
        self.sync_candidate();
    }

    /// Route a peer message to the right per-slot state. Messages for
    /// finished slots are dropped, nominations for the next slot are
    /// buffered, and anything further ahead is an error for the caller to
    /// log.
    pub fn handle(&mut self, peer: Address, msg: Message) -> Result<(), ConsensusError> {
        msg.validate()?;
        let slot = msg.slot();
        if slot < self.slot {
            debug!("ignoring message for finished slot {}", slot);
            return Ok(());
        }
        if slot == self.slot + 1 {
            if msg.is_nominate() {
                debug!("buffering early nomination for slot {}", slot);
                self.buffered.push((peer, msg));
            }
            return Ok(());
        }
        if slot > self.slot + 1 {
            return Err(ConsensusError::SlotTooFarAhead {
                local: self.slot,
                got: slot,
            });
        }

        if msg.is_nominate() {
            self.nomination.handle(peer, msg)?;
            self.sync_candidate();
        } else {
            self.ballot.handle(peer, msg)?;
        }
        Ok(())
    }

    /// Escalate the ballot after a timeout without progress
    pub fn bump_ballot(&mut self) {
        self.ballot.bump();
    }

    /// Collect the messages this node should broadcast now
    pub fn outgoing(&mut self) -> Vec<Message> {
        self.sync_candidate();
        let mut messages = Vec::new();
        if let Some(msg) = self.nomination.take_message() {
            messages.push(msg);
        }
        if let Some(msg) = self.ballot.take_message() {
            messages.push(msg);
        }
        messages
    }

    /// Once the ballot protocol externalizes, apply the decided value to
    /// the ledger and advance to the next slot.
    ///
    /// The decided value is pre-validated against the current state:
    /// transactions that no longer validate are dropped individually and
    /// the chunk carries the surviving subset in canonical order.
    pub fn harvest(
        &mut self,
        accounts: &mut AccountStore,
    ) -> Result<Option<LedgerChunk>, ConsensusError> {
        let Some((value, _cn, _hn)) = self.ballot.externalized() else {
            return Ok(None);
        };

        let mut working = accounts.snapshot();
        let mut surviving = Vec::new();
        for tx in value.operations() {
            // The value came from consensus, so re-check signatures too:
            // peers may have included operations this node never queued
            if tx.verify() && working.validate(tx) {
                working.apply(tx)?;
                surviving.push(tx.clone());
            } else {
                debug!("dropping stale transaction from externalized value");
            }
        }
        accounts.apply_batch(&surviving)?;

        let chunk = LedgerChunk::new(surviving, accounts.accounts().clone());
        self.prev_chunk_hash = chunk.hash()?;
        info!(
            "slot {} externalized {} transactions, chunk {}",
            self.slot,
            chunk.transactions.len(),
            self.prev_chunk_hash
        );

        self.advance();
        Ok(Some(chunk))
    }

    /// Fresh nomination and ballot state for the next slot, replaying any
    /// buffered nominations.
    fn advance(&mut self) {
        self.slot += 1;
        let seed = leader_seed(self.slot, 0, &self.prev_chunk_hash);
        self.nomination =
            NominationState::new(self.me.clone(), self.slice.clone(), self.slot, seed);
        self.ballot = BallotState::new(self.me.clone(), self.slice.clone(), self.slot);

        let buffered = std::mem::take(&mut self.buffered);
        for (peer, msg) in buffered {
            if msg.slot() == self.slot {
                if let Err(e) = self.handle(peer, msg) {
                    debug!("buffered nomination rejected: {}", e);
                }
            }
        }
    }

    fn sync_candidate(&mut self) {
        if self.ballot.has_started() {
            return;
        }
        if let Some(candidate) = self.nomination.candidate_value() {
            self.ballot.maybe_start(candidate);
        }
    }
}

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use aureus_consensus::{BallotPhase, SignedMessage, SlotBuilder, SlotValue};
use aureus_core::{Address, Hash, KeyPair, SignedOperation};
use aureus_ledger::{AccountStore, TransactionQueue};
use aureus_store::{ChunkStore, Storage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;

/// Maximum transactions drawn from the queue into one candidate value
const CHUNK_TRANSACTION_LIMIT: usize = 200;

/// The three event kinds that drive all state transitions. Events are
/// serialized through a single channel; there is no other entry point
/// into the consensus or ledger state.
#[derive(Debug, Clone)]
pub enum Event {
    /// An incoming peer message
    Peer(SignedMessage),
    /// A locally submitted operation
    Submit(SignedOperation),
    /// A timer tick, for ballot escalation
    Tick,
}

/// The Aureus node: a cooperative state machine over one event channel.
pub struct Node<S: Storage> {
    me: Address,
    keypair: KeyPair,
    accounts: AccountStore,
    queue: TransactionQueue,
    chunks: ChunkStore<S>,
    builder: SlotBuilder,
    outbound: mpsc::UnboundedSender<SignedMessage>,
    ballot_timeout: Duration,
    last_progress: (u64, BallotPhase, Option<u32>),
    last_progress_at: Instant,
}

impl<S: Storage> Node<S> {
    /// Build a node from its configuration and storage.
    ///
    /// Recovery: all durable chunks are loaded (verifying their digests),
    /// replayed from the genesis balances, and cross-checked against each
    /// chunk's recorded state. Consensus state is per-slot and
    /// discardable, so the node resumes at the slot after the last
    /// durable chunk.
    pub fn new(
        config: &NodeConfig,
        storage: S,
        outbound: mpsc::UnboundedSender<SignedMessage>,
    ) -> Result<Self> {
        let keypair = config.keypair()?;
        let me = keypair.address();
        let slice = config.to_quorum_slice()?;

        let mut accounts = AccountStore::new();
        for (address, balance) in config.genesis_accounts() {
            accounts.credit(&address, balance);
        }

        let chunks = ChunkStore::new(storage);
        let mut prev_chunk_hash = Hash::ZERO;
        let mut next_slot = 1;
        for (slot, chunk) in chunks.load_all()? {
            accounts.apply_batch(&chunk.transactions)?;
            if accounts.accounts() != &chunk.state {
                bail!("replayed state for slot {} does not match its chunk", slot);
            }
            prev_chunk_hash = chunk.hash()?;
            next_slot = slot + 1;
        }
        if next_slot > 1 {
            info!("recovered {} slots from storage", next_slot - 1);
        }

        let mut queue = TransactionQueue::new(config.queue_limit as usize);
        queue.refresh(&accounts);

        let builder = SlotBuilder::new(me.clone(), slice, next_slot, prev_chunk_hash);
        let last_progress = builder.progress();

        Ok(Node {
            me,
            keypair,
            accounts,
            queue,
            chunks,
            builder,
            outbound,
            ballot_timeout: Duration::from_millis(config.ballot_timeout_ms as u64),
            last_progress,
            last_progress_at: Instant::now(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.me
    }

    pub fn slot(&self) -> u64 {
        self.builder.slot()
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn chunk_store(&self) -> &ChunkStore<S> {
        &self.chunks
    }

    /// Process events until the channel closes
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) -> Result<()> {
        info!("node {:?} starting at slot {}", self.me, self.builder.slot());
        while let Some(event) = events.recv().await {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Apply one event. Peer-induced failures are logged and dropped;
    /// only storage and ledger-application failures are fatal.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Peer(signed) => {
                if !signed.verify() {
                    warn!("dropping message with bad signature from {:?}", signed.signer);
                } else if let Err(e) = self.builder.handle(signed.signer.clone(), signed.message) {
                    warn!("dropping message from {:?}: {}", signed.signer, e);
                }
            }
            Event::Submit(operation) => {
                self.queue.add(operation);
            }
            Event::Tick => {
                self.check_ballot_timer();
            }
        }
        self.post_process()
    }

    /// After every event: harvest externalized slots, keep nominating,
    /// and broadcast whatever changed.
    fn post_process(&mut self) -> Result<()> {
        while let Some(chunk) = self.builder.harvest(&mut self.accounts)? {
            let slot = self.builder.slot() - 1;
            self.chunks.put_chunk(slot, &chunk)?;
            for tx in &chunk.transactions {
                self.queue.remove(tx);
            }
            self.queue.refresh(&self.accounts);
            info!(
                "slot {} committed with {} transactions",
                slot,
                chunk.transactions.len()
            );
        }

        let candidates = self.queue.top(CHUNK_TRANSACTION_LIMIT);
        if !candidates.is_empty() {
            self.builder.propose(SlotValue::new(candidates));
        }

        for message in self.builder.outgoing() {
            let signed = SignedMessage::sign(message, &self.keypair)?;
            // Non-blocking enqueue; the transport owns delivery
            if self.outbound.send(signed).is_err() {
                debug!("outbound channel closed");
            }
        }

        let progress = self.builder.progress();
        if progress != self.last_progress {
            self.last_progress = progress;
            self.last_progress_at = Instant::now();
        }
        Ok(())
    }

    /// Escalate the ballot when no progress happened within the deadline.
    /// The deadline grows linearly with the ballot counter.
    fn check_ballot_timer(&mut self) {
        let Some(counter) = self.builder.ballot_counter() else {
            return;
        };
        if self.builder.progress().1 == BallotPhase::Externalize {
            return;
        }
        let deadline = self.ballot_timeout * counter;
        if self.last_progress_at.elapsed() >= deadline {
            debug!("ballot timeout at counter {}", counter);
            self.builder.bump_ballot();
            self.last_progress_at = Instant::now();
        }
    }
}

//! # Agreement Engine
//!
//! One engine runs both agreement variants; the registry's mode decides
//! whether a PREPARE round precedes COMMIT and which quorum applies.
//!
//! ## Locking
//!
//! All state that decides a height (round, candidate arena, peer table)
//! lives in `EngineState` behind a single async mutex that only `tick`
//! takes. Inbound handlers never take it: they verify what they receive
//! without engine state and push it to a bounded inbox that the next tick
//! drains. Status and block-range requests are answered from the chain
//! store's read lock and a gossip snapshot published at the end of every
//! tick, so a peer waiting on us never waits on our tick.
//!
//! ## Tick order
//!
//! ```text
//! drain inbox → liveness → sync → propose → vote/finalize → view change → flush
//! ```

mod inbound;
mod liveness;
mod proposal;
mod quorum;
mod sync;
mod view_change;


use crate::adapters::{Ed25519Verifier, LoggingObserver};
use crate::domain::{
    CandidateArena, ConsensusConfig, ConsensusError, ConsensusResult, Inbox, PeerTable,
    RoundState, ValidatorInfo, ValidatorRegistry,
};
use crate::metrics;
use crate::ports::{
    BlockObserver, BlockSigner, ConsensusApi, LinkError, PeerLink, SignatureVerifier,
    SystemTimeSource, TimeSource, TransactionPool,
};
use crate::validation::MessageValidator;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    short_hash, Block, ConfirmedBlock, ConsensusMessage, Hash, NodeStatus, Phase, ValidatorId,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use vc_02_chain_store::{ChainStore, HeightHandle};

/// Collaborators the engine drives.
pub struct EngineDeps {
    pub link: Arc<dyn PeerLink>,
    pub signer: Arc<dyn BlockSigner>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub pool: Arc<dyn TransactionPool>,
    pub observer: Arc<dyn BlockObserver>,
    pub time: Arc<dyn TimeSource>,
}

impl EngineDeps {
    /// Ed25519 verification, a logging observer and the system clock.
    pub fn new(
        link: Arc<dyn PeerLink>,
        signer: Arc<dyn BlockSigner>,
        pool: Arc<dyn TransactionPool>,
    ) -> Self {
        Self {
            link,
            signer,
            verifier: Arc::new(Ed25519Verifier),
            pool,
            observer: Arc::new(LoggingObserver),
            time: Arc::new(SystemTimeSource),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BlockObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_time(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }
}

/// Verified input waiting for the next tick.
#[derive(Debug)]
enum Inbound {
    Message(ConsensusMessage),
    Block(ConfirmedBlock),
}

/// Broadcast produced during a tick, sent at its end.
#[derive(Debug, Clone)]
enum Outbound {
    Message(ConsensusMessage),
    Block(ConfirmedBlock),
}

/// State only a tick may touch.
struct EngineState {
    round: RoundState,
    arena: CandidateArena,
    peers: PeerTable,
    outbox: Vec<Outbound>,
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Last confirmed height after the tick.
    pub height: u64,
    /// View at the height being decided.
    pub view: u64,
    pub active: bool,
    pub reachable_peers: usize,
    /// Heights finalized by local quorum during this tick.
    pub finalized: Vec<u64>,
    /// Blocks appended from peers (sync batches and confirmed-block
    /// broadcasts).
    pub synced: usize,
    /// Whether this tick sent a VIEWCHANGE.
    pub view_change_requested: bool,
}

/// Block agreement engine for one validator (or follower).
pub struct AgreementEngine {
    config: ConsensusConfig,
    registry: Arc<ValidatorRegistry>,
    validator: MessageValidator,
    store: Arc<RwLock<ChainStore>>,
    height: HeightHandle,
    state: tokio::sync::Mutex<EngineState>,
    inbox: Mutex<Inbox<Inbound>>,
    gossip: RwLock<Vec<ConsensusMessage>>,
    active: AtomicBool,
    view: AtomicU64,
    link: Arc<dyn PeerLink>,
    signer: Arc<dyn BlockSigner>,
    pool: Arc<dyn TransactionPool>,
    observer: Arc<dyn BlockObserver>,
    time: Arc<dyn TimeSource>,
}

impl AgreementEngine {
    /// Build an engine over an opened chain store.
    ///
    /// Fails when the signing key is not the registry's local identity or
    /// when the configured mode disagrees with the registry's.
    pub fn new(
        config: ConsensusConfig,
        registry: ValidatorRegistry,
        store: ChainStore,
        deps: EngineDeps,
    ) -> ConsensusResult<Self> {
        if &deps.signer.public_key() != registry.self_id() {
            return Err(ConsensusError::KeyMismatch);
        }
        if registry.mode() != config.mode {
            return Err(ConsensusError::ModeMismatch {
                configured: config.mode,
                registry: registry.mode(),
            });
        }

        let registry = Arc::new(registry);
        let validator = MessageValidator::new(
            Arc::clone(&registry),
            Arc::clone(&deps.verifier),
            config.max_txs_per_block,
        );
        let height = store.height_handle();
        let next = store.last_height() + 1;
        let inbox = Inbox::new(config.inbox_capacity, config.inbox_per_signer);

        Ok(Self {
            config,
            registry,
            validator,
            store: Arc::new(RwLock::new(store)),
            height,
            state: tokio::sync::Mutex::new(EngineState {
                round: RoundState::new(next),
                arena: CandidateArena::new(),
                peers: PeerTable::new(),
                outbox: Vec::new(),
            }),
            inbox: Mutex::new(inbox),
            gossip: RwLock::new(Vec::new()),
            active: AtomicBool::new(false),
            view: AtomicU64::new(0),
            link: deps.link,
            signer: deps.signer,
            pool: deps.pool,
            observer: deps.observer,
            time: deps.time,
        })
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn self_id(&self) -> ValidatorId {
        *self.registry.self_id()
    }

    /// View at the height being decided, as of the last tick.
    pub fn current_view(&self) -> u64 {
        self.view.load(Ordering::Acquire)
    }

    /// Last confirmed block and its certificate.
    pub fn last_confirmed(&self) -> ConfirmedBlock {
        self.store.read().last_confirmed().clone()
    }

    /// Confirmed block at `height`, if any.
    pub fn confirmed_at(&self, height: u64) -> ConsensusResult<Option<ConfirmedBlock>> {
        Ok(self.store.read().get_by_height(height)?)
    }

    /// Messages queued by inbound handlers and not yet drained.
    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Messages from `signer` waiting in the inbox.
    pub fn queued_from(&self, signer: &ValidatorId) -> usize {
        self.inbox.lock().queued_from(signer)
    }

    /// Run one scheduler step. Never fails: every per-message and per-peer
    /// error is logged and dropped inside the tick.
    pub async fn tick(&self) -> TickReport {
        let started = Instant::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let mut synced = self.drain_inbox(state).await;
        self.refresh_liveness(state).await;
        synced += self.synchronize(state).await;
        self.propose(state).await;
        let finalized = self.advance_rounds(state).await;
        let progressed = synced > 0 || !finalized.is_empty();
        let view_change_requested = self.check_view_change(state, progressed);
        self.flush_outbox(state).await;
        self.publish_snapshot(state);

        let report = TickReport {
            height: self.height.get(),
            view: state.round.view,
            active: self.is_active(),
            reachable_peers: state.peers.reachable_count(),
            finalized,
            synced,
            view_change_requested,
        };
        self.log_status(state, &report);
        metrics::record_tick_latency(started.elapsed().as_secs_f64());
        report
    }

    /// Append a verified block and reset the round for the next height.
    async fn commit_block(
        &self,
        state: &mut EngineState,
        confirmed: ConfirmedBlock,
    ) -> ConsensusResult<()> {
        let height = confirmed.height();
        self.store.write().append(confirmed.clone())?;
        state.arena.prune_through(height);
        state.round.advance_to(height + 1);
        self.view.store(0, Ordering::Release);

        self.pool.remove(&confirmed.block.transaction_ids()).await;
        self.observer.on_confirmed_block(&confirmed);
        metrics::record_block_finalized(height);
        Ok(())
    }

    fn sign_message(
        &self,
        phase: Phase,
        view: u64,
        seq: u64,
        block_hash: Hash,
        block: Option<Block>,
    ) -> ConsensusMessage {
        ConsensusMessage::sign_with(phase, view, seq, block_hash, block, self.self_id(), |digest| {
            self.signer.sign(digest)
        })
    }

    /// Record our own message and queue it for broadcast.
    fn emit(&self, state: &mut EngineState, message: ConsensusMessage) {
        state.arena.insert(message.clone());
        state.outbox.push(Outbound::Message(message));
    }

    /// Signed report of our head plus the messages held for the next height.
    fn local_status(&self, messages: Vec<ConsensusMessage>) -> NodeStatus {
        let (last_height, last_hash) = {
            let store = self.store.read();
            (store.last_height(), store.last_hash())
        };
        NodeStatus::sign_with(
            last_height,
            last_hash,
            messages,
            self.time.now_millis(),
            self.self_id(),
            |digest| self.signer.sign(digest),
        )
    }

    /// Apply the per-call deadline to a peer call.
    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, LinkError>>,
    ) -> Result<T, LinkError> {
        tokio::time::timeout(self.config.rpc_timeout, call)
            .await
            .map_err(|_| LinkError::Timeout)?
    }

    async fn send(&self, peer: &ValidatorInfo, item: &Outbound) -> Result<(), LinkError> {
        match item {
            Outbound::Message(message) => {
                self.with_deadline(self.link.send_message(peer, message.clone()))
                    .await
            }
            Outbound::Block(block) => {
                self.with_deadline(self.link.send_block(peer, block.clone()))
                    .await
            }
        }
    }

    /// Broadcast everything produced this tick to reachable peers.
    async fn flush_outbox(&self, state: &mut EngineState) {
        let outbox = std::mem::take(&mut state.outbox);
        if outbox.is_empty() {
            return;
        }
        let targets: Vec<&ValidatorInfo> = self
            .registry
            .peers()
            .filter(|peer| state.peers.is_reachable(&peer.id))
            .collect();

        let sends = outbox.iter().flat_map(|item| {
            targets.iter().map(move |peer| async move {
                (peer.id, self.send(peer, item).await)
            })
        });
        for (peer, result) in futures::future::join_all(sends).await {
            if let Err(e) = result {
                debug!(peer = %short_hash(&peer), error = %e, "Broadcast failed");
            }
        }
    }

    fn publish_snapshot(&self, state: &EngineState) {
        *self.gossip.write() = state.arena.messages_at(state.round.height);
        self.view.store(state.round.view, Ordering::Release);
    }

    fn log_status(&self, state: &EngineState, report: &TickReport) {
        let (hash, prepares, commits) = {
            let store = self.store.read();
            let last = store.last_confirmed();
            (
                store.last_hash(),
                last.messages.count(Phase::Prepare),
                last.messages.count(Phase::Commit),
            )
        };
        debug!(
            height = report.height,
            hash = %short_hash(&hash),
            prepares,
            commits,
            view = report.view,
            pending = state.arena.vote_count(state.round.height),
            view_changes = state
                .arena
                .view_change_votes(state.round.height, state.round.view + 1, &hash),
            active = report.active,
            peers = report.reachable_peers,
            "Tick complete"
        );
    }
}

#[async_trait]
impl ConsensusApi for AgreementEngine {
    async fn ping(&self, _timestamp: u64) -> u64 {
        self.time.now_millis()
    }

    async fn exchange_status(&self, status: NodeStatus) -> ConsensusResult<NodeStatus> {
        self.accept_status(status)?;
        let messages = self.gossip.read().clone();
        Ok(self.local_status(messages))
    }

    async fn handle_message(&self, message: ConsensusMessage) -> ConsensusResult<()> {
        let (phase, signer) = (message.phase, message.signer);
        let result = self.admit_message(message);
        if let Err(e) = &result {
            debug!(%phase, signer = %short_hash(&signer), error = %e, "Dropped consensus message");
            metrics::record_message_dropped(e.reason());
        }
        result
    }

    async fn handle_confirmed_block(&self, block: ConfirmedBlock) -> ConsensusResult<()> {
        let height = block.height();
        let result = self.admit_block(block);
        if let Err(e) = &result {
            debug!(height, error = %e, "Dropped confirmed block");
            metrics::record_message_dropped(e.reason());
        }
        result
    }

    async fn block_range(&self, from: u64, count: u32) -> ConsensusResult<Vec<ConfirmedBlock>> {
        let count = count.min(self.config.sync_batch_size);
        // Genesis is configured locally, never exchanged.
        let from = from.max(1);
        Ok(self
            .store
            .read()
            .block_range(from, count, self.config.sync_max_bytes)?)
    }

    fn current_height(&self) -> u64 {
        self.height.get()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

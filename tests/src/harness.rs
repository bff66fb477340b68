//! # Simulation Harness
//!
//! In-process validator clusters on a `LocalPeerNetwork`, plus helpers for
//! forging the messages a Byzantine validator would send.

use shared_crypto::ValidatorKeyPair;
use shared_types::{Block, ConsensusMessage, Hash, Phase, Transaction, ValidatorId};
use std::sync::Arc;
use vc_02_chain_store::{ChainStore, InMemoryKVStore};
use vc_08_consensus::{
    AgreementEngine, AgreementMode, ConsensusApi, ConsensusConfig, Ed25519Signer, EngineDeps,
    InMemoryTransactionPool, LocalPeerNetwork, PeerLink, RecordingObserver, ValidatorInfo,
    ValidatorRegistry,
};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000_000;

pub fn seed(index: usize) -> [u8; 32] {
    [index as u8 + 1; 32]
}

pub fn keypair(index: usize) -> ValidatorKeyPair {
    ValidatorKeyPair::from_seed(seed(index))
}

pub fn genesis() -> Block {
    Block::genesis(GENESIS_TIMESTAMP, vec![])
}

/// One simulated validator.
pub struct SimNode {
    pub index: usize,
    pub id: ValidatorId,
    pub engine: Arc<AgreementEngine>,
    pub observer: Arc<RecordingObserver>,
    pub pool: Arc<InMemoryTransactionPool>,
}

/// `n` validators with seeds `seed(0)..seed(n-1)`.
pub struct SimCluster {
    pub network: Arc<LocalPeerNetwork>,
    pub infos: Vec<ValidatorInfo>,
    pub nodes: Vec<SimNode>,
}

impl SimCluster {
    pub fn new(n: usize, mode: AgreementMode) -> Self {
        let network = LocalPeerNetwork::new();
        let infos: Vec<ValidatorInfo> = (0..n)
            .map(|i| ValidatorInfo::new(keypair(i).public_key(), "127.0.0.1", 7000 + i as u16))
            .collect();

        let nodes = (0..n)
            .map(|index| {
                let id = infos[index].id;
                let link: Arc<dyn PeerLink> = network.link_for(id);
                let registry = ValidatorRegistry::new(id, infos.clone(), mode)
                    .expect("validator set is valid");
                let store = ChainStore::open(Box::new(InMemoryKVStore::new()), genesis())
                    .expect("fresh store opens");
                let observer = Arc::new(RecordingObserver::new());
                let pool = Arc::new(InMemoryTransactionPool::new());
                let deps = EngineDeps::new(link, Arc::new(Ed25519Signer::new(keypair(index))), pool.clone())
                    .with_observer(observer.clone());
                let engine = Arc::new(
                    AgreementEngine::new(ConsensusConfig::for_testing(mode), registry, store, deps)
                        .expect("engine builds"),
                );
                let api: Arc<dyn ConsensusApi> = engine.clone();
                network.register(id, &api);
                SimNode {
                    index,
                    id,
                    engine,
                    observer,
                    pool,
                }
            })
            .collect();

        Self {
            network,
            infos,
            nodes,
        }
    }

    pub fn quorum(&self) -> usize {
        self.nodes[0].engine.registry().quorum_size()
    }

    /// Index of the scheduled proposer for `(height, view)`.
    pub fn proposer_index(&self, height: u64, view: u64) -> usize {
        let id = self.nodes[0].engine.registry().proposer_for(height, view);
        self.index_of(id)
    }

    pub fn index_of(&self, id: &ValidatorId) -> usize {
        self.infos
            .iter()
            .position(|info| &info.id == id)
            .expect("id belongs to the cluster")
    }

    pub fn set_online(&self, index: usize, online: bool) {
        self.network.set_online(self.nodes[index].id, online);
    }

    /// Take every validator but `index` offline.
    pub fn isolate(&self, index: usize) {
        for node in &self.nodes {
            self.network.set_online(node.id, node.index == index);
        }
    }

    pub fn online(&self) -> impl Iterator<Item = &SimNode> {
        self.nodes.iter().filter(|n| self.network.is_online(&n.id))
    }

    /// One round: every online validator ticks once, in index order.
    pub async fn tick_online(&self) {
        for node in self.online() {
            node.engine.tick().await;
        }
    }

    /// Tick until every online validator reaches `height`. Returns the
    /// rounds used.
    pub async fn run_until(&self, height: u64, max_rounds: usize) -> usize {
        for round in 1..=max_rounds {
            self.tick_online().await;
            if self.online().all(|n| n.engine.current_height() >= height) {
                return round;
            }
        }
        panic!(
            "cluster did not reach height {height} in {max_rounds} rounds: {:?}",
            self.heights()
        );
    }

    pub fn heights(&self) -> Vec<u64> {
        self.nodes.iter().map(|n| n.engine.current_height()).collect()
    }

    /// Every height held by two validators holds the same block.
    pub fn assert_no_fork(&self) {
        let top = self.heights().into_iter().max().unwrap_or(0);
        for height in 1..=top {
            let mut hashes: Vec<Hash> = self
                .nodes
                .iter()
                .filter_map(|n| n.engine.confirmed_at(height).expect("store readable"))
                .map(|b| b.hash())
                .collect();
            hashes.dedup();
            assert!(hashes.len() <= 1, "conflicting blocks finalized at height {height}");
        }
    }

    /// The confirmation hook saw `1..=height` exactly once, in order.
    pub fn assert_hook_sequence(&self, node: &SimNode) {
        let expected: Vec<u64> = (1..=node.engine.current_height()).collect();
        assert_eq!(node.observer.heights(), expected);
    }
}

/// A signed block and its PROPOSE message, as validator `index` would make.
pub fn proposal(
    index: usize,
    height: u64,
    view: u64,
    prev_hash: Hash,
    transactions: Vec<Transaction>,
) -> (Block, ConsensusMessage) {
    let keys = keypair(index);
    let block = Block::new(
        height,
        prev_hash,
        GENESIS_TIMESTAMP + height,
        keys.public_key(),
        transactions,
    );
    let signature = keys.sign(&block.hash());
    let block = block.with_signature(signature);
    let message = ConsensusMessage::sign_with(
        Phase::Propose,
        view,
        height,
        block.hash(),
        Some(block.clone()),
        keys.public_key(),
        |digest| keys.sign(digest),
    );
    (block, message)
}

/// A PREPARE, COMMIT or VIEWCHANGE signed by validator `index`.
pub fn vote(index: usize, phase: Phase, view: u64, seq: u64, hash: Hash) -> ConsensusMessage {
    signed_by(&keypair(index), phase, view, seq, hash)
}

pub fn signed_by(
    keys: &ValidatorKeyPair,
    phase: Phase,
    view: u64,
    seq: u64,
    hash: Hash,
) -> ConsensusMessage {
    ConsensusMessage::sign_with(phase, view, seq, hash, None, keys.public_key(), |digest| {
        keys.sign(digest)
    })
}

/// A one-transaction payload that makes otherwise equal blocks differ.
pub fn marker(tag: u64) -> Vec<Transaction> {
    vec![Transaction::new([0xAB; 32], tag, tag.to_be_bytes().to_vec(), tag)]
}

/// Single-threaded runtime for driving async code inside proptest cases.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime builds")
}

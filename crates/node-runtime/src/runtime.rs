//! # Node Wiring
//!
//! Builds one validator from its configuration:
//!
//! ```text
//! NodeConfig ──→ genesis ──→ ChainStore (memory | rocksdb)
//!      │                          │
//!      └──→ ValidatorRegistry ──→ AgreementEngine ←── PeerServer (inbound TCP)
//!                                   │        │
//!                          TcpPeerLink       Scheduler (tick loop)
//! ```

use crate::config::{NodeConfig, StorageBackend};
use crate::genesis::genesis_block;
use anyhow::{Context, Result};
use shared_types::{short_hash, Block};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vc_02_chain_store::{ChainStore, KeyValueStore};
use vc_05_peer_link::{PeerLinkConfig, PeerServer, TcpPeerLink};
use vc_08_consensus::{
    AgreementEngine, ConsensusApi, Ed25519Signer, EngineDeps, InMemoryTransactionPool, Scheduler,
    ValidatorRegistry,
};

/// Grace period for the server and scheduler to stop.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A configured, not yet running validator.
pub struct NodeRuntime {
    engine: Arc<AgreementEngine>,
    pool: Arc<InMemoryTransactionPool>,
    server: PeerServer,
    tick_interval: Duration,
}

impl NodeRuntime {
    /// Open storage, bind the listener and assemble the engine.
    pub async fn build(config: &NodeConfig) -> Result<Self> {
        let consensus = config.consensus_config()?;
        let keypair = config.signing_keypair()?;
        let self_id = keypair.public_key();
        let registry = ValidatorRegistry::new(self_id, config.validator_infos()?, consensus.mode)
            .context("Invalid validator set")?;
        if !registry.is_validator() {
            warn!(id = %short_hash(&self_id), "Local key is not in the validator set, following only");
        }

        let genesis = genesis_block(&config.genesis);
        let store = open_store(config, genesis)?;
        info!(
            height = store.last_height(),
            hash = %short_hash(&store.last_hash()),
            "Chain store opened"
        );

        let link_config = PeerLinkConfig {
            request_timeout: consensus.rpc_timeout,
            connect_timeout: consensus.rpc_timeout,
            ..PeerLinkConfig::default()
        };
        let pool = Arc::new(InMemoryTransactionPool::new());
        let deps = EngineDeps::new(
            Arc::new(TcpPeerLink::new(link_config.clone())),
            Arc::new(Ed25519Signer::new(keypair)),
            pool.clone(),
        );
        let tick_interval = consensus.tick_interval;
        let engine = Arc::new(
            AgreementEngine::new(consensus, registry, store, deps)
                .context("Failed to create agreement engine")?,
        );

        let listen_addr = config.listen_addr()?;
        let server = PeerServer::bind(listen_addr, engine.clone(), link_config)
            .await
            .with_context(|| format!("Failed to bind {listen_addr}"))?;

        Ok(Self {
            engine,
            pool,
            server,
            tick_interval,
        })
    }

    pub fn engine(&self) -> Arc<AgreementEngine> {
        Arc::clone(&self.engine)
    }

    pub fn pool(&self) -> Arc<InMemoryTransactionPool> {
        Arc::clone(&self.pool)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.local_addr()?)
    }

    /// Spawn the peer server and the tick scheduler.
    pub fn start(self) -> RunningNode {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = self.server.spawn(shutdown_rx.clone());
        let scheduler =
            Scheduler::new(Arc::clone(&self.engine), self.tick_interval).spawn(shutdown_rx);
        info!(
            id = %short_hash(&self.engine.self_id()),
            mode = %self.engine.config().mode,
            validators = self.engine.registry().len(),
            height = self.engine.current_height(),
            "Node started"
        );
        RunningNode {
            engine: self.engine,
            pool: self.pool,
            shutdown_tx,
            server,
            scheduler,
        }
    }
}

/// Handle to a started validator.
pub struct RunningNode {
    engine: Arc<AgreementEngine>,
    pool: Arc<InMemoryTransactionPool>,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<()>,
    scheduler: JoinHandle<u64>,
}

impl RunningNode {
    pub fn engine(&self) -> Arc<AgreementEngine> {
        Arc::clone(&self.engine)
    }

    pub fn pool(&self) -> Arc<InMemoryTransactionPool> {
        Arc::clone(&self.pool)
    }

    /// Signal shutdown and wait for the server and scheduler to stop.
    pub async fn shutdown(self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            warn!("Shutdown signal had no receivers");
        }

        let ticks = tokio::time::timeout(SHUTDOWN_GRACE, self.scheduler)
            .await
            .context("Scheduler did not stop in time")?
            .context("Scheduler task failed")?;
        tokio::time::timeout(SHUTDOWN_GRACE, self.server)
            .await
            .context("Peer server did not stop in time")?
            .context("Peer server task failed")?;

        info!(ticks, height = self.engine.current_height(), "Shutdown complete");
        Ok(())
    }
}

fn open_store(config: &NodeConfig, genesis: Block) -> Result<ChainStore> {
    let kv: Box<dyn KeyValueStore> = match config.node.storage {
        StorageBackend::Memory => Box::new(crate::adapters::storage::InMemoryKVStore::new()),
        StorageBackend::Rocksdb => open_rocksdb(config)?,
    };
    ChainStore::open(kv, genesis).context("Failed to open chain store")
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &NodeConfig) -> Result<Box<dyn KeyValueStore>> {
    use crate::adapters::storage::{RocksDbConfig, RocksDbStore};

    let path = config.node.data_dir.join("chain");
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let store = RocksDbStore::open(&RocksDbConfig::new(path)).context("Failed to open RocksDB")?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &NodeConfig) -> Result<Box<dyn KeyValueStore>> {
    anyhow::bail!("storage = \"rocksdb\" needs node-runtime built with the `rocksdb` feature")
}

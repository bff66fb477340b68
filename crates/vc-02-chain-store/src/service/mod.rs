//! # Chain Store Service
//!
//! Append-only store of confirmed blocks with a height index and a cached
//! head. Opening a store either seeds it with the genesis block or walks
//! the stored chain from genesis and checks every link.

use crate::adapters::BincodeBlockSerializer;
use crate::domain::keys::{block_key, height_key, LAST_HEIGHT_KEY};
use crate::domain::{ChainStoreError, HeightHandle};
use crate::ports::{BatchOperation, BlockSerializer, KeyValueStore};
use shared_types::{short_hash, Block, ConfirmedBlock, Hash, MessageSet};
use tracing::{debug, info};

/// Result alias for chain store operations.
pub type Result<T> = std::result::Result<T, ChainStoreError>;

/// Confirmed-block store.
pub struct ChainStore {
    kv: Box<dyn KeyValueStore>,
    serializer: Box<dyn BlockSerializer>,
    genesis_hash: Hash,
    last: ConfirmedBlock,
    last_hash: Hash,
    height: HeightHandle,
}

impl ChainStore {
    /// Open a store with the default serializer.
    pub fn open(kv: Box<dyn KeyValueStore>, genesis: Block) -> Result<Self> {
        Self::open_with(kv, Box::new(BincodeBlockSerializer), genesis)
    }

    /// Open a store, seeding it with `genesis` when empty.
    ///
    /// A non-empty store must hold the same genesis block and an unbroken
    /// chain up to its recorded head.
    pub fn open_with(
        mut kv: Box<dyn KeyValueStore>,
        serializer: Box<dyn BlockSerializer>,
        genesis: Block,
    ) -> Result<Self> {
        if !genesis.is_genesis() {
            return Err(ChainStoreError::InvalidGenesis {
                height: genesis.height,
            });
        }
        let genesis_hash = genesis.hash();

        let Some(raw_height) = kv.get(LAST_HEIGHT_KEY)? else {
            let confirmed = ConfirmedBlock::new(genesis, MessageSet::new());
            let bytes = serializer.serialize(&confirmed)?;
            kv.atomic_batch_write(vec![
                BatchOperation::put(block_key(&genesis_hash), bytes),
                BatchOperation::put(height_key(0), genesis_hash.to_vec()),
                BatchOperation::put(LAST_HEIGHT_KEY, 0u64.to_be_bytes().to_vec()),
            ])?;
            info!(genesis = %short_hash(&genesis_hash), "Initialized chain store");
            return Ok(Self {
                kv,
                serializer,
                genesis_hash,
                last: confirmed,
                last_hash: genesis_hash,
                height: HeightHandle::new(0),
            });
        };

        let last_height = decode_height(&raw_height)?;
        let mut store = Self {
            kv,
            serializer,
            genesis_hash,
            last: ConfirmedBlock::new(genesis, MessageSet::new()),
            last_hash: genesis_hash,
            height: HeightHandle::new(0),
        };
        store.verify_chain(last_height)?;
        info!(
            height = store.last_height(),
            head = %short_hash(&store.last_hash),
            "Opened chain store"
        );
        Ok(store)
    }

    /// Walk heights `0..=last_height` and restore the head.
    fn verify_chain(&mut self, last_height: u64) -> Result<()> {
        let stored_genesis = self
            .hash_at(0)?
            .ok_or(ChainStoreError::MissingHeight(0))?;
        if stored_genesis != self.genesis_hash {
            return Err(ChainStoreError::GenesisMismatch {
                stored: stored_genesis,
                configured: self.genesis_hash,
            });
        }

        let mut prev = self.load_at(0)?;
        for height in 1..=last_height {
            let current = self.load_at(height)?;
            if current.block.height != height || current.block.prev_hash != prev.hash() {
                return Err(ChainStoreError::BrokenLink { height });
            }
            prev = current;
        }

        self.last_hash = prev.hash();
        self.last = prev;
        self.height.publish(last_height);
        Ok(())
    }

    fn hash_at(&self, height: u64) -> Result<Option<Hash>> {
        match self.kv.get(&height_key(height))? {
            Some(raw) => {
                let hash: Hash = raw.as_slice().try_into().map_err(|_| {
                    ChainStoreError::CorruptMetadata(format!("index entry at height {height}"))
                })?;
                Ok(Some(hash))
            }
            None => Ok(None),
        }
    }

    fn load_at(&self, height: u64) -> Result<ConfirmedBlock> {
        self.get_by_height(height)?
            .ok_or(ChainStoreError::MissingHeight(height))
    }

    /// Append the block at `last_height + 1`.
    ///
    /// Quorum verification is the caller's job; the store only enforces
    /// contiguity and hash linkage.
    pub fn append(&mut self, confirmed: ConfirmedBlock) -> Result<()> {
        let expected = self.last_height() + 1;
        let height = confirmed.height();
        if height != expected {
            return Err(ChainStoreError::HeightGap {
                expected,
                actual: height,
            });
        }
        if confirmed.block.prev_hash != self.last_hash {
            return Err(ChainStoreError::BrokenLink { height });
        }

        let hash = confirmed.hash();
        let bytes = self.serializer.serialize(&confirmed)?;
        self.kv.atomic_batch_write(vec![
            BatchOperation::put(block_key(&hash), bytes),
            BatchOperation::put(height_key(height), hash.to_vec()),
            BatchOperation::put(LAST_HEIGHT_KEY, height.to_be_bytes().to_vec()),
        ])?;

        self.last = confirmed;
        self.last_hash = hash;
        self.height.publish(height);
        debug!(height, hash = %short_hash(&hash), "Appended confirmed block");
        Ok(())
    }

    /// Load a confirmed block by hash.
    pub fn get_by_hash(&self, hash: &Hash) -> Result<Option<ConfirmedBlock>> {
        match self.kv.get(&block_key(hash))? {
            Some(bytes) => Ok(Some(self.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load a confirmed block by height.
    pub fn get_by_height(&self, height: u64) -> Result<Option<ConfirmedBlock>> {
        match self.hash_at(height)? {
            Some(hash) => self.get_by_hash(&hash),
            None => Ok(None),
        }
    }

    /// Whether a block with this hash is confirmed.
    pub fn contains(&self, hash: &Hash) -> Result<bool> {
        Ok(self.kv.exists(&block_key(hash))?)
    }

    /// Up to `count` consecutive blocks starting at `from`.
    ///
    /// Stops before the cumulative encoded size would exceed `max_bytes`,
    /// but always returns at least one block when `from` is confirmed.
    pub fn block_range(&self, from: u64, count: u32, max_bytes: u64) -> Result<Vec<ConfirmedBlock>> {
        let last = self.last_height();
        let mut blocks = Vec::new();
        let mut total: u64 = 0;
        let end = from.saturating_add(u64::from(count)).min(last.saturating_add(1));

        for height in from..end {
            let hash = self
                .hash_at(height)?
                .ok_or(ChainStoreError::MissingHeight(height))?;
            let bytes = self
                .kv
                .get(&block_key(&hash))?
                .ok_or(ChainStoreError::MissingHeight(height))?;
            let size = bytes.len() as u64;
            if !blocks.is_empty() && total + size > max_bytes {
                break;
            }
            total += size;
            blocks.push(self.serializer.deserialize(&bytes)?);
        }
        Ok(blocks)
    }

    /// Last confirmed block.
    pub fn last_confirmed(&self) -> &ConfirmedBlock {
        &self.last
    }

    /// Hash of the last confirmed block.
    pub fn last_hash(&self) -> Hash {
        self.last_hash
    }

    /// Last confirmed height.
    pub fn last_height(&self) -> u64 {
        self.height.get()
    }

    /// Hash of the genesis block this store was opened with.
    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    /// Lock-free handle on the last confirmed height.
    pub fn height_handle(&self) -> HeightHandle {
        self.height.clone()
    }
}

fn decode_height(raw: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| ChainStoreError::CorruptMetadata("last height record".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

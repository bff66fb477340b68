//! # Genesis
//!
//! Every validator derives the same genesis block from its `[genesis]`
//! section. The chain tag is recorded as the only genesis transaction, so
//! two chains with different tags never accept each other's blocks.

use crate::config::GenesisSection;
use shared_types::{Block, Transaction};

/// Build the genesis block for `config`.
pub fn genesis_block(config: &GenesisSection) -> Block {
    let tag = Transaction::new(
        [0u8; 32],
        0,
        config.chain_tag.as_bytes().to_vec(),
        config.timestamp,
    );
    Block::genesis(config.timestamp, vec![tag])
}

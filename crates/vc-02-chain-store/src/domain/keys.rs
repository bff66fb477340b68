//! Storage key layout.

use shared_types::Hash;

pub const BLOCK_PREFIX: &[u8] = b"blk:";
pub const INDEX_PREFIX: &[u8] = b"idx:";
pub const LAST_HEIGHT_KEY: &[u8] = b"meta:last_height";

pub fn block_key(hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOCK_PREFIX.len() + 32);
    key.extend_from_slice(BLOCK_PREFIX);
    key.extend_from_slice(hash);
    key
}

/// Big-endian so that a prefix scan returns heights in order.
pub fn height_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(INDEX_PREFIX.len() + 8);
    key.extend_from_slice(INDEX_PREFIX);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_keys_sort_numerically() {
        assert!(height_key(9) < height_key(10));
        assert!(height_key(255) < height_key(256));
    }
}

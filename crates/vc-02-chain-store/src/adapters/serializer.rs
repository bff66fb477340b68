use crate::domain::SerializationError;
use crate::ports::BlockSerializer;
use shared_types::{codec, ConfirmedBlock};

/// Default block serializer using the canonical bincode codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeBlockSerializer;

impl BlockSerializer for BincodeBlockSerializer {
    fn serialize(&self, block: &ConfirmedBlock) -> Result<Vec<u8>, SerializationError> {
        codec::encode(block).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn deserialize(&self, data: &[u8]) -> Result<ConfirmedBlock, SerializationError> {
        codec::decode(data).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }
}

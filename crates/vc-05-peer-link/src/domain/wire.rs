//! # Wire Protocol
//!
//! Strict request/response over one TCP connection: the client writes a
//! `PeerRequest` frame and waits for exactly one `PeerResponse` frame
//! before sending the next request on that connection.

use serde::{Deserialize, Serialize};
use shared_types::{ConfirmedBlock, ConsensusMessage, NodeStatus};

/// Calls a validator can make on a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    Ping { timestamp: u64 },
    Status(NodeStatus),
    Message(ConsensusMessage),
    Block(ConfirmedBlock),
    BlockRange { from: u64, count: u32 },
}

impl PeerRequest {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerRequest::Ping { .. } => "ping",
            PeerRequest::Status(_) => "status",
            PeerRequest::Message(_) => "message",
            PeerRequest::Block(_) => "block",
            PeerRequest::BlockRange { .. } => "block_range",
        }
    }
}

/// Answers to `PeerRequest`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerResponse {
    Pong { timestamp: u64 },
    Status(NodeStatus),
    /// The message or block was accepted for processing.
    Ack,
    Blocks(Vec<ConfirmedBlock>),
    /// The handler rejected the request.
    Error(String),
}

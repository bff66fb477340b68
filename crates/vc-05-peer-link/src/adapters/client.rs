//! # TCP Peer Link
//!
//! `PeerLink` over TCP. One connection per peer is opened lazily and
//! reused; requests to the same peer are serialized on it, requests to
//! different peers run independently. Any failure drops the connection so
//! the next call reconnects.

use super::codec::FrameCodec;
use crate::domain::{PeerLinkConfig, PeerRequest, PeerResponse, TransportError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared_types::{short_hash, ConfirmedBlock, ConsensusMessage, NodeStatus, ValidatorId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};
use vc_08_consensus::{LinkError, PeerLink, ValidatorInfo};

type ClientFramed = Framed<TcpStream, FrameCodec<PeerResponse, PeerRequest>>;
type Slot = Arc<Mutex<Option<ClientFramed>>>;

/// Client side of the peer protocol.
pub struct TcpPeerLink {
    config: PeerLinkConfig,
    connections: parking_lot::Mutex<HashMap<ValidatorId, Slot>>,
}

impl TcpPeerLink {
    pub fn new(config: PeerLinkConfig) -> Self {
        Self {
            config,
            connections: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, peer: &ValidatorId) -> Slot {
        Arc::clone(self.connections.lock().entry(*peer).or_default())
    }

    async fn connect(&self, peer: &ValidatorInfo) -> Result<ClientFramed, LinkError> {
        let address = peer.address();
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| LinkError::Timeout)?
            .map_err(|e| LinkError::Unreachable(format!("{address}: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| LinkError::Unreachable(e.to_string()))?;
        debug!(peer = %short_hash(&peer.id), %address, "Connected to peer");
        Ok(Framed::new(
            stream,
            FrameCodec::new(self.config.max_frame_bytes),
        ))
    }

    /// One request/response round trip.
    ///
    /// The connection is taken out of its slot for the exchange and only
    /// returned once the response has been read. A call cancelled midway
    /// drops the connection with it, so an unread response can never be
    /// handed to the next request.
    async fn call(&self, peer: &ValidatorInfo, request: PeerRequest) -> Result<PeerResponse, LinkError> {
        let slot = self.slot(&peer.id);
        let mut connection = slot.lock().await;
        let mut framed = match connection.take() {
            Some(framed) => framed,
            None => self.connect(peer).await?,
        };

        let kind = request.kind();
        let outcome = timeout(self.config.request_timeout, exchange(&mut framed, request)).await;
        let result = match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(LinkError::from(e)),
            Err(_) => Err(LinkError::Timeout),
        };
        match &result {
            Ok(_) => {
                trace!(peer = %short_hash(&peer.id), kind, "Request answered");
                *connection = Some(framed);
            }
            Err(e) => {
                debug!(peer = %short_hash(&peer.id), kind, error = %e, "Request failed, dropping connection");
            }
        }

        match result? {
            PeerResponse::Error(reason) => Err(LinkError::Remote(reason)),
            response => Ok(response),
        }
    }

    /// Close the cached connection to `peer`, if any.
    pub async fn disconnect(&self, peer: &ValidatorId) {
        let slot = self.connections.lock().remove(peer);
        if let Some(slot) = slot {
            slot.lock().await.take();
        }
    }
}

async fn exchange(framed: &mut ClientFramed, request: PeerRequest) -> Result<PeerResponse, TransportError> {
    framed.send(request).await?;
    match framed.next().await {
        Some(response) => response,
        None => Err(TransportError::Closed),
    }
}

fn unexpected(response: PeerResponse) -> LinkError {
    LinkError::Protocol(format!("unexpected response {response:?}"))
}

#[async_trait]
impl PeerLink for TcpPeerLink {
    async fn ping(&self, peer: &ValidatorInfo, timestamp: u64) -> Result<u64, LinkError> {
        match self.call(peer, PeerRequest::Ping { timestamp }).await? {
            PeerResponse::Pong { timestamp } => Ok(timestamp),
            other => Err(unexpected(other)),
        }
    }

    async fn exchange_status(
        &self,
        peer: &ValidatorInfo,
        status: NodeStatus,
    ) -> Result<NodeStatus, LinkError> {
        match self.call(peer, PeerRequest::Status(status)).await? {
            PeerResponse::Status(remote) => Ok(remote),
            other => Err(unexpected(other)),
        }
    }

    async fn send_message(
        &self,
        peer: &ValidatorInfo,
        message: ConsensusMessage,
    ) -> Result<(), LinkError> {
        match self.call(peer, PeerRequest::Message(message)).await? {
            PeerResponse::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn send_block(&self, peer: &ValidatorInfo, block: ConfirmedBlock) -> Result<(), LinkError> {
        match self.call(peer, PeerRequest::Block(block)).await? {
            PeerResponse::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn fetch_block_range(
        &self,
        peer: &ValidatorInfo,
        from: u64,
        count: u32,
    ) -> Result<Vec<ConfirmedBlock>, LinkError> {
        match self.call(peer, PeerRequest::BlockRange { from, count }).await? {
            PeerResponse::Blocks(blocks) if blocks.len() <= count as usize => Ok(blocks),
            PeerResponse::Blocks(blocks) => Err(LinkError::Protocol(format!(
                "{} blocks for a request of {count}",
                blocks.len()
            ))),
            other => Err(unexpected(other)),
        }
    }
}

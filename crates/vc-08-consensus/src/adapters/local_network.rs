//! # In-Process Peer Network
//!
//! Routes `PeerLink` calls directly to other engines in the same process.
//! Used for multi-validator simulations: validators can be taken offline,
//! and broadcasts can be held in a queue so a test decides the order (and
//! multiplicity) in which they arrive.

use crate::domain::ValidatorInfo;
use crate::ports::{ConsensusApi, LinkError, PeerLink};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    short_hash, ConfirmedBlock, ConsensusMessage, NodeStatus, ValidatorId,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};

/// Payload of a held broadcast.
#[derive(Debug, Clone)]
pub enum DeliveryPayload {
    Message(ConsensusMessage),
    Block(ConfirmedBlock),
}

/// A broadcast waiting to be delivered.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub from: ValidatorId,
    pub to: ValidatorId,
    pub payload: DeliveryPayload,
}

#[derive(Default)]
struct HeldQueue {
    active: bool,
    queue: VecDeque<Delivery>,
}

/// Shared routing table for in-process validators.
#[derive(Default)]
pub struct LocalPeerNetwork {
    nodes: RwLock<HashMap<ValidatorId, Weak<dyn ConsensusApi>>>,
    offline: RwLock<HashSet<ValidatorId>>,
    held: Mutex<HeldQueue>,
}

impl LocalPeerNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Link used by the validator `origin` to reach the others.
    pub fn link_for(self: &Arc<Self>, origin: ValidatorId) -> Arc<LocalPeerLink> {
        Arc::new(LocalPeerLink {
            network: Arc::clone(self),
            origin,
        })
    }

    /// Make `api` reachable as `id`. Holds only a weak reference.
    pub fn register(&self, id: ValidatorId, api: &Arc<dyn ConsensusApi>) {
        self.nodes.write().insert(id, Arc::downgrade(api));
    }

    /// Take a validator off the network (or bring it back). An offline
    /// validator can neither send nor receive.
    pub fn set_online(&self, id: ValidatorId, online: bool) {
        let mut offline = self.offline.write();
        if online {
            offline.remove(&id);
        } else {
            offline.insert(id);
        }
    }

    pub fn is_online(&self, id: &ValidatorId) -> bool {
        !self.offline.read().contains(id)
    }

    /// Queue `send_message`/`send_block` calls instead of delivering them.
    /// Already queued deliveries stay queued when holding is turned off.
    pub fn hold_broadcasts(&self, hold: bool) {
        self.held.lock().active = hold;
    }

    /// Number of queued deliveries.
    pub fn pending(&self) -> usize {
        self.held.lock().queue.len()
    }

    /// Deliver the queued item at `index % pending()`. With `keep` the item
    /// stays queued, so it will be delivered again later.
    pub async fn deliver(&self, index: usize, keep: bool) -> bool {
        let delivery = {
            let queue = &mut self.held.lock().queue;
            if queue.is_empty() {
                return false;
            }
            let index = index % queue.len();
            if keep {
                queue[index].clone()
            } else {
                match queue.remove(index) {
                    Some(delivery) => delivery,
                    None => return false,
                }
            }
        };
        self.dispatch(delivery).await;
        true
    }

    /// Deliver everything queued, in order.
    pub async fn deliver_all(&self) {
        while self.deliver(0, false).await {}
    }

    async fn dispatch(&self, delivery: Delivery) {
        let Ok(target) = self.route(&delivery.from, &delivery.to) else {
            return;
        };
        // Handler rejections are the sender's problem; a held broadcast has
        // no sender waiting.
        let _ = match delivery.payload {
            DeliveryPayload::Message(message) => target.handle_message(message).await,
            DeliveryPayload::Block(block) => target.handle_confirmed_block(block).await,
        };
    }

    fn route(&self, from: &ValidatorId, to: &ValidatorId) -> Result<Arc<dyn ConsensusApi>, LinkError> {
        if !self.is_online(from) || !self.is_online(to) {
            return Err(LinkError::Unreachable(short_hash(to)));
        }
        self.nodes
            .read()
            .get(to)
            .and_then(Weak::upgrade)
            .ok_or_else(|| LinkError::Unreachable(short_hash(to)))
    }

    /// Queue the delivery if holding; otherwise hand it back.
    fn try_hold(&self, delivery: Delivery) -> Option<Delivery> {
        let mut held = self.held.lock();
        if !held.active {
            return Some(delivery);
        }
        held.queue.push_back(delivery);
        None
    }
}

/// `PeerLink` for one validator on a `LocalPeerNetwork`.
pub struct LocalPeerLink {
    network: Arc<LocalPeerNetwork>,
    origin: ValidatorId,
}

impl LocalPeerLink {
    async fn broadcast(&self, peer: &ValidatorInfo, payload: DeliveryPayload) -> Result<(), LinkError> {
        let target = self.network.route(&self.origin, &peer.id)?;
        let delivery = Delivery {
            from: self.origin,
            to: peer.id,
            payload,
        };
        let Some(delivery) = self.network.try_hold(delivery) else {
            return Ok(());
        };
        let result = match delivery.payload {
            DeliveryPayload::Message(message) => target.handle_message(message).await,
            DeliveryPayload::Block(block) => target.handle_confirmed_block(block).await,
        };
        result.map_err(|e| LinkError::Remote(e.to_string()))
    }
}

#[async_trait]
impl PeerLink for LocalPeerLink {
    async fn ping(&self, peer: &ValidatorInfo, timestamp: u64) -> Result<u64, LinkError> {
        let target = self.network.route(&self.origin, &peer.id)?;
        Ok(target.ping(timestamp).await)
    }

    async fn exchange_status(
        &self,
        peer: &ValidatorInfo,
        status: NodeStatus,
    ) -> Result<NodeStatus, LinkError> {
        let target = self.network.route(&self.origin, &peer.id)?;
        target
            .exchange_status(status)
            .await
            .map_err(|e| LinkError::Remote(e.to_string()))
    }

    async fn send_message(
        &self,
        peer: &ValidatorInfo,
        message: ConsensusMessage,
    ) -> Result<(), LinkError> {
        self.broadcast(peer, DeliveryPayload::Message(message)).await
    }

    async fn send_block(&self, peer: &ValidatorInfo, block: ConfirmedBlock) -> Result<(), LinkError> {
        self.broadcast(peer, DeliveryPayload::Block(block)).await
    }

    async fn fetch_block_range(
        &self,
        peer: &ValidatorInfo,
        from: u64,
        count: u32,
    ) -> Result<Vec<ConfirmedBlock>, LinkError> {
        let target = self.network.route(&self.origin, &peer.id)?;
        target
            .block_range(from, count)
            .await
            .map_err(|e| LinkError::Remote(e.to_string()))
    }
}

//! Loopback tests: a `TcpPeerLink` talking to a `PeerServer` over real
//! sockets, with a canned `ConsensusApi` behind the server.

use crate::{PeerLinkConfig, PeerServer, TcpPeerLink};
use async_trait::async_trait;
use shared_types::{Block, ConfirmedBlock, ConsensusMessage, MessageSet, NodeStatus, Phase};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use vc_08_consensus::{
    ConsensusApi, ConsensusError, ConsensusResult, LinkError, PeerLink, ValidatorInfo,
};

struct CannedApi {
    chain: Vec<ConfirmedBlock>,
    messages: AtomicUsize,
    ping_delay: Duration,
}

impl CannedApi {
    fn with_chain(length: u64) -> Self {
        let chain = (0..=length)
            .map(|height| {
                let mut block = Block::genesis(1_000 + height, vec![]);
                block.height = height;
                ConfirmedBlock::new(block, MessageSet::new())
            })
            .collect();
        Self {
            chain,
            messages: AtomicUsize::new(0),
            ping_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ConsensusApi for CannedApi {
    async fn ping(&self, timestamp: u64) -> u64 {
        tokio::time::sleep(self.ping_delay).await;
        timestamp + 1
    }

    async fn exchange_status(&self, status: NodeStatus) -> ConsensusResult<NodeStatus> {
        Ok(NodeStatus {
            last_height: self.current_height(),
            ..status
        })
    }

    async fn handle_message(&self, message: ConsensusMessage) -> ConsensusResult<()> {
        if message.phase == Phase::ViewChange {
            return Err(ConsensusError::UnknownValidator("stranger".to_string()));
        }
        self.messages.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_confirmed_block(&self, _block: ConfirmedBlock) -> ConsensusResult<()> {
        Ok(())
    }

    async fn block_range(&self, from: u64, count: u32) -> ConsensusResult<Vec<ConfirmedBlock>> {
        Ok(self
            .chain
            .iter()
            .skip(from as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    fn current_height(&self) -> u64 {
        (self.chain.len() - 1) as u64
    }

    fn is_active(&self) -> bool {
        true
    }
}

fn fast_config() -> PeerLinkConfig {
    PeerLinkConfig {
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_millis(300),
        ..PeerLinkConfig::default()
    }
}

fn message(phase: Phase) -> ConsensusMessage {
    ConsensusMessage::sign_with(phase, 0, 1, [7u8; 32], None, [1u8; 32], |_| [0u8; 64])
}

async fn serve(api: Arc<CannedApi>) -> (ValidatorInfo, Arc<CannedApi>, watch::Sender<bool>) {
    let server = PeerServer::bind("127.0.0.1:0", api.clone(), fast_config())
        .await
        .unwrap();
    let port = server.local_addr().unwrap().port();
    let (tx, rx) = watch::channel(false);
    server.spawn(rx);
    (ValidatorInfo::new([9u8; 32], "127.0.0.1", port), api, tx)
}

#[tokio::test]
async fn test_ping_round_trip() {
    let (peer, _api, _shutdown) = serve(Arc::new(CannedApi::with_chain(0))).await;
    let link = TcpPeerLink::new(fast_config());

    assert_eq!(link.ping(&peer, 41).await.unwrap(), 42);
    // Second call reuses the cached connection.
    assert_eq!(link.ping(&peer, 99).await.unwrap(), 100);
}

#[tokio::test]
async fn test_status_exchange_returns_remote_head() {
    let (peer, _api, _shutdown) = serve(Arc::new(CannedApi::with_chain(4))).await;
    let link = TcpPeerLink::new(fast_config());

    let ours = NodeStatus::sign_with(1, [3u8; 32], vec![message(Phase::Prepare)], 5, [1u8; 32], |_| {
        [0u8; 64]
    });
    let theirs = link.exchange_status(&peer, ours.clone()).await.unwrap();
    assert_eq!(theirs.last_height, 4);
    assert_eq!(theirs.messages, ours.messages);
}

#[tokio::test]
async fn test_block_range_is_served_in_order() {
    let (peer, _api, _shutdown) = serve(Arc::new(CannedApi::with_chain(10))).await;
    let link = TcpPeerLink::new(fast_config());

    let blocks = link.fetch_block_range(&peer, 3, 4).await.unwrap();
    let heights: Vec<u64> = blocks.iter().map(ConfirmedBlock::height).collect();
    assert_eq!(heights, vec![3, 4, 5, 6]);
}

#[tokio::test]
async fn test_messages_are_acknowledged() {
    let (peer, api, _shutdown) = serve(Arc::new(CannedApi::with_chain(0))).await;
    let link = TcpPeerLink::new(fast_config());

    link.send_message(&peer, message(Phase::Prepare)).await.unwrap();
    link.send_message(&peer, message(Phase::Commit)).await.unwrap();
    assert_eq!(api.messages.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_handler_rejection_maps_to_remote_error() {
    let (peer, _api, _shutdown) = serve(Arc::new(CannedApi::with_chain(0))).await;
    let link = TcpPeerLink::new(fast_config());

    let err = link
        .send_message(&peer, message(Phase::ViewChange))
        .await
        .unwrap_err();
    match err {
        LinkError::Remote(reason) => assert!(reason.contains("stranger")),
        other => panic!("expected remote error, got {other:?}"),
    }
    // The connection survives a rejected request.
    assert_eq!(link.ping(&peer, 1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_cancelled_call_does_not_leak_its_response() {
    let api = CannedApi {
        ping_delay: Duration::from_millis(200),
        ..CannedApi::with_chain(0)
    };
    let (peer, _api, _shutdown) = serve(Arc::new(api)).await;
    let link = TcpPeerLink::new(PeerLinkConfig {
        request_timeout: Duration::from_millis(600),
        ..fast_config()
    });
    assert_eq!(link.ping(&peer, 1).await.unwrap(), 2);

    // Both calls share the cached connection. The second one waits for the
    // first, sends, and is cancelled by the caller before its reply lands.
    let deadline = Duration::from_millis(300);
    let (first, second) = tokio::join!(
        tokio::time::timeout(deadline, link.ping(&peer, 20)),
        tokio::time::timeout(deadline, link.ping(&peer, 1)),
    );
    assert_eq!(first.unwrap().unwrap(), 21);
    assert!(second.is_err());

    assert_eq!(link.ping(&peer, 50).await.unwrap(), 51);
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let link = TcpPeerLink::new(fast_config());
    let peer = ValidatorInfo::new([9u8; 32], "127.0.0.1", port);
    let err = link.ping(&peer, 1).await.unwrap_err();
    assert!(matches!(err, LinkError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });

    let link = TcpPeerLink::new(fast_config());
    let peer = ValidatorInfo::new([9u8; 32], "127.0.0.1", port);
    let err = link.ping(&peer, 1).await.unwrap_err();
    assert!(matches!(err, LinkError::Timeout), "got {err:?}");
    hold.abort();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let (peer, _api, shutdown) = serve(Arc::new(CannedApi::with_chain(0))).await;
    let link = TcpPeerLink::new(fast_config());
    assert_eq!(link.ping(&peer, 1).await.unwrap(), 2);

    shutdown.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    link.disconnect(&peer.id).await;

    assert!(link.ping(&peer, 1).await.is_err());
}

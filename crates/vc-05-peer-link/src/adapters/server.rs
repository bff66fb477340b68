//! # Peer Server
//!
//! Accepts peer connections and dispatches each request to the local
//! `ConsensusApi`. Handlers never wait on an engine tick, so a slow tick
//! does not stall remote callers.

use super::codec::FrameCodec;
use crate::domain::{PeerLinkConfig, PeerRequest, PeerResponse};
use futures::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};
use vc_08_consensus::{ConsensusApi, ConsensusResult};

/// Listening side of the peer protocol.
pub struct PeerServer {
    listener: TcpListener,
    api: Arc<dyn ConsensusApi>,
    config: PeerLinkConfig,
}

impl PeerServer {
    pub async fn bind(
        address: impl ToSocketAddrs,
        api: Arc<dyn ConsensusApi>,
        config: PeerLinkConfig,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            api,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` turns `true` or its sender is
    /// dropped. Open connections are closed on the same signal.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        match self.listener.local_addr() {
            Ok(address) => info!(%address, "Peer server listening"),
            Err(e) => warn!(error = %e, "Peer server listening on unknown address"),
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        trace!(%remote, "Accepted peer connection");
                        tokio::spawn(serve_connection(
                            stream,
                            remote,
                            Arc::clone(&self.api),
                            self.config.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept peer connection"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Peer server stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    api: Arc<dyn ConsensusApi>,
    config: PeerLinkConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%remote, error = %e, "Failed to set TCP_NODELAY");
    }
    let mut framed = Framed::new(
        stream,
        FrameCodec::<PeerRequest, PeerResponse>::new(config.max_frame_bytes),
    );

    loop {
        let next = tokio::select! {
            next = timeout(config.idle_timeout, framed.next()) => next,
            _ = shutdown.changed() => break,
        };
        let request = match next {
            Err(_) => {
                trace!(%remote, "Closing idle peer connection");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(%remote, error = %e, "Malformed request, closing connection");
                break;
            }
            Ok(Some(Ok(request))) => request,
        };

        let kind = request.kind();
        let response = dispatch(api.as_ref(), request).await;
        if let PeerResponse::Error(reason) = &response {
            trace!(%remote, kind, %reason, "Request rejected");
        }
        if let Err(e) = framed.send(response).await {
            debug!(%remote, error = %e, "Failed to write response");
            break;
        }
    }
}

fn acknowledge(result: ConsensusResult<()>) -> PeerResponse {
    match result {
        Ok(()) => PeerResponse::Ack,
        Err(e) => PeerResponse::Error(e.to_string()),
    }
}

/// Route one request to the engine.
pub async fn dispatch(api: &dyn ConsensusApi, request: PeerRequest) -> PeerResponse {
    match request {
        PeerRequest::Ping { timestamp } => PeerResponse::Pong {
            timestamp: api.ping(timestamp).await,
        },
        PeerRequest::Status(status) => match api.exchange_status(status).await {
            Ok(status) => PeerResponse::Status(status),
            Err(e) => PeerResponse::Error(e.to_string()),
        },
        PeerRequest::Message(message) => acknowledge(api.handle_message(message).await),
        PeerRequest::Block(block) => acknowledge(api.handle_confirmed_block(block).await),
        PeerRequest::BlockRange { from, count } => match api.block_range(from, count).await {
            Ok(blocks) => PeerResponse::Blocks(blocks),
            Err(e) => PeerResponse::Error(e.to_string()),
        },
    }
}

//! TCP adapters: framing codec, client link and server.

mod client;
mod codec;
mod server;

pub use client::TcpPeerLink;
pub use codec::FrameCodec;
pub use server::{dispatch, PeerServer};

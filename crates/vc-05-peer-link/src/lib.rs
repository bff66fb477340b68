//! # vc-05-peer-link
//!
//! TCP transport between validators.
//!
//! `TcpPeerLink` implements the engine's outbound `PeerLink` port and
//! `PeerServer` feeds inbound requests into its `ConsensusApi` port:
//!
//! ```text
//! AgreementEngine ──PeerLink──→ TcpPeerLink ══TCP══→ PeerServer ──ConsensusApi──→ AgreementEngine
//! ```
//!
//! Frames are a 4-byte big-endian length followed by a bincode-encoded
//! `PeerRequest` or `PeerResponse`. Each connection carries one request at a
//! time.

pub mod adapters;
pub mod domain;

pub use adapters::{dispatch, FrameCodec, PeerServer, TcpPeerLink};
pub use domain::{PeerLinkConfig, PeerRequest, PeerResponse, TransportError};

#[cfg(test)]
mod tests;

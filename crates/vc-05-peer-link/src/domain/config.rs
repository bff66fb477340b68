use shared_types::codec::MAX_ENCODED_SIZE;
use std::time::Duration;

/// Transport limits shared by client and server.
#[derive(Debug, Clone)]
pub struct PeerLinkConfig {
    /// Deadline for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for one request/response round trip.
    pub request_timeout: Duration,
    /// Largest frame accepted or sent.
    pub max_frame_bytes: usize,
    /// Server side: idle time after which a connection is closed.
    pub idle_timeout: Duration,
}

impl Default for PeerLinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(5),
            max_frame_bytes: MAX_ENCODED_SIZE as usize,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

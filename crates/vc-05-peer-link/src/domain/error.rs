use shared_types::CodecError;
use std::io;
use vc_08_consensus::LinkError;

/// Framing and socket failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Connection closed by peer")]
    Closed,
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => LinkError::Unreachable(e.to_string()),
            TransportError::Closed => LinkError::Unreachable("connection closed".to_string()),
            TransportError::FrameTooLarge { .. } | TransportError::Codec(_) => {
                LinkError::Protocol(err.to_string())
            }
        }
    }
}

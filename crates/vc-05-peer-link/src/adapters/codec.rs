//! A length-delimited frame codec carrying canonically encoded values.
//!
//! Each frame is a 4-byte big-endian length followed by the bincode
//! encoding of one value. `I` is the decoded (incoming) type and `O` the
//! encoded (outgoing) one, so the client and server use mirrored codecs.

use crate::domain::TransportError;
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::codec;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

pub struct FrameCodec<I, O> {
    frames: LengthDelimitedCodec,
    max_frame_bytes: usize,
    _incoming: PhantomData<I>,
    _outgoing: PhantomData<O>,
}

impl<I, O> FrameCodec<I, O> {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(max_frame_bytes)
                .new_codec(),
            max_frame_bytes,
            _incoming: PhantomData,
            _outgoing: PhantomData,
        }
    }
}

impl<I: DeserializeOwned, O> Decoder for FrameCodec<I, O> {
    type Item = I;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.frames.decode(src)? else {
            return Ok(None);
        };
        Ok(Some(codec::decode(&frame)?))
    }
}

impl<I, O: Serialize> Encoder<O> for FrameCodec<I, O> {
    type Error = TransportError;

    fn encode(&mut self, item: O, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = codec::encode(&item)?;
        if bytes.len() > self.max_frame_bytes {
            return Err(TransportError::FrameTooLarge {
                size: bytes.len(),
                max: self.max_frame_bytes,
            });
        }
        self.frames.encode(Bytes::from(bytes), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerRequest, PeerResponse};

    type ClientCodec = FrameCodec<PeerResponse, PeerRequest>;
    type ServerCodec = FrameCodec<PeerRequest, PeerResponse>;

    #[test]
    fn test_request_survives_framing() {
        let mut buf = BytesMut::new();
        ClientCodec::new(1024)
            .encode(PeerRequest::BlockRange { from: 3, count: 8 }, &mut buf)
            .unwrap();

        let decoded = ServerCodec::new(1024).decode(&mut buf).unwrap();
        assert_eq!(decoded, Some(PeerRequest::BlockRange { from: 3, count: 8 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let mut full = BytesMut::new();
        ServerCodec::new(1024)
            .encode(PeerResponse::Pong { timestamp: 42 }, &mut full)
            .unwrap();

        let mut codec = ClientCodec::new(1024);
        let mut partial = full.split_to(full.len() - 1);
        assert_eq!(codec.decode(&mut partial).unwrap(), None);

        partial.unsplit(full);
        assert_eq!(
            codec.decode(&mut partial).unwrap(),
            Some(PeerResponse::Pong { timestamp: 42 })
        );
    }

    #[test]
    fn test_oversized_frames_are_rejected() {
        let big = PeerResponse::Error("x".repeat(64));
        let mut buf = BytesMut::new();
        let err = ServerCodec::new(16).encode(big.clone(), &mut buf).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));

        // A peer that ignores the limit is cut off on decode.
        ServerCodec::new(1024).encode(big, &mut buf).unwrap();
        assert!(ClientCodec::new(16).decode(&mut buf).is_err());
    }

    #[test]
    fn test_garbage_payload_is_a_codec_error() {
        let mut buf = BytesMut::new();
        LengthDelimitedCodec::new()
            .encode(Bytes::from_static(&[0xFF, 0xFF, 0xFF]), &mut buf)
            .unwrap();
        let err = ClientCodec::new(1024).decode(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Codec(_)));
    }
}

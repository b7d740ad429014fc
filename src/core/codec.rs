//! Length-prefixed frame codec for raw byte streams.
//!
//! Every handshake and post-handshake message travels as one frame: a 4-byte
//! little-endian length followed by the payload. The length is validated
//! against a configurable ceiling before any allocation, so a malicious peer
//! cannot force memory exhaustion with a forged header.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_FRAME_SIZE;
use crate::error::ProtocolError;

/// Framing codec used underneath the handshake and the secure stream.
#[derive(Debug, Clone)]
pub struct LengthCodec {
    max_frame_size: usize,
}

impl LengthCodec {
    pub fn new(max_frame_size: usize) -> Self {
        LengthCodec { max_frame_size }
    }
}

impl Default for LengthCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl Decoder for LengthCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let mut raw = [0u8; 4];
        raw.copy_from_slice(&src[..4]);
        let len = u32::from_le_bytes(raw) as usize;

        if len > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(len));
        }

        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        src.advance(4);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for LengthCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if item.len() > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(item.len()));
        }
        dst.reserve(4 + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrip() {
        let mut codec = LengthCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"hello frame"), &mut buf)
            .unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&decoded[..], b"hello frame");
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more() {
        let mut codec = LengthCodec::default();
        let mut full = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"partial"), &mut full)
            .unwrap();

        let mut partial = BytesMut::from(&full[..5]);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_rejected() {
        let mut codec = LengthCodec::new(16);
        let mut buf = BytesMut::new();
        buf.put_u32_le(1024);
        buf.put_slice(&[0u8; 8]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedFrame(1024))
        ));
    }

    #[test]
    fn oversized_outgoing_rejected() {
        let mut codec = LengthCodec::new(4);
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Bytes::from_static(b"too big"), &mut buf)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedFrame(7)));
    }
}

//! Property-based tests using proptest
//!
//! These tests validate wire-format invariants across randomly generated
//! and randomly corrupted inputs: decoders must return structured errors
//! and never panic, over-allocate, or accept malformed frames.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use secure_channel::core::codec::LengthCodec;
use secure_channel::protocol::discovery::{DiscoveryMessage, GetNodes, Node, Nodes};
use secure_channel::protocol::identify::IdentifyMessage;
use secure_channel::protocol::message::Propose;
use tokio_util::codec::{Decoder, Encoder};

fn sample_propose() -> Propose {
    Propose {
        rand: Bytes::from_static(&[7u8; 16]),
        pubkey: secure_channel::PublicKey::Secp256k1(Bytes::from_static(&[2u8; 33])),
        exchanges: "X25519".to_string(),
        ciphers: "AES256,AES128".to_string(),
        hashes: "SHA256".to_string(),
    }
}

// Every strict prefix of a valid table encoding must fail to decode.
#[test]
fn test_truncated_propose_always_errors() {
    let encoded = sample_propose().encode();
    for len in 0..encoded.len() {
        assert!(
            Propose::decode(encoded.slice(..len)).is_err(),
            "prefix of {len} bytes decoded"
        );
    }
}

// Property: flipping any single byte never panics the decoder. It may
// still decode (byte landed in a payload), but must never misbehave.
proptest! {
    #[test]
    fn prop_single_byte_corruption_never_panics(
        pos in 0usize..256,
        value in any::<u8>(),
    ) {
        let message = DiscoveryMessage::Nodes(Nodes {
            announce: false,
            items: vec![
                Node { addresses: vec![Bytes::from_static(b"/ip4/1.2.3.4/tcp/9000")] },
                Node { addresses: vec![Bytes::from_static(b"/ip6/::1/tcp/9001")] },
            ],
        });
        let encoded = message.encode();
        let pos = pos % encoded.len();

        let mut corrupted = encoded.to_vec();
        corrupted[pos] = value;
        let _ = DiscoveryMessage::decode(Bytes::from(corrupted));
    }
}

// Property: arbitrary bytes fed to every decoder return an error or a
// value, never a panic.
proptest! {
    #[test]
    fn prop_arbitrary_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let buf = Bytes::from(data);
        let _ = Propose::decode(buf.clone());
        let _ = GetNodes::decode(buf.clone());
        let _ = Nodes::decode(buf.clone());
        let _ = DiscoveryMessage::decode(buf.clone());
        let _ = IdentifyMessage::decode(buf);
    }
}

// Property: identify messages survive the wire for arbitrary address sets.
proptest! {
    #[test]
    fn prop_identify_roundtrip(
        listen in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8),
        observed in prop::collection::vec(any::<u8>(), 0..64),
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let message = IdentifyMessage {
            listen_addrs: listen.into_iter().map(Bytes::from).collect(),
            observed_addr: Bytes::from(observed),
            identify: Bytes::from(payload),
        };
        let decoded = IdentifyMessage::decode(message.encode()).expect("decode");
        prop_assert_eq!(decoded, message);
    }
}

// Property: the frame codec round-trips any payload under the size cap
// and rejects declared lengths above it before allocating.
proptest! {
    #[test]
    fn prop_frame_codec_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
        let mut codec = LengthCodec::new(1024 * 1024);
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from(payload.clone()), &mut buf).expect("encode");
        let decoded = codec.decode(&mut buf).expect("decode").expect("complete frame");
        prop_assert_eq!(&decoded[..], &payload[..]);
        prop_assert!(buf.is_empty());
    }
}

proptest! {
    #[test]
    fn prop_oversized_declared_length_rejected(excess in 1u32..1024) {
        let cap = 4096usize;
        let mut codec = LengthCodec::new(cap);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&(cap as u32 + excess).to_le_bytes());
        prop_assert!(codec.decode(&mut buf).is_err());
    }
}

// Crafted corruptions assert the specific structured error, not just "some
// error": a reversed offset pair must be caught by the monotonicity check.
#[test]
fn test_decreasing_offsets_are_rejected() {
    let mut raw = sample_propose().encode().to_vec();
    // Field offsets start after the 4-byte total size; swap offsets 1 and 2.
    let off1 = u32::from_le_bytes(raw[8..12].try_into().unwrap());
    let off2 = u32::from_le_bytes(raw[12..16].try_into().unwrap());
    assert!(off1 < off2);
    raw[8..12].copy_from_slice(&off2.to_le_bytes());
    raw[12..16].copy_from_slice(&off1.to_le_bytes());

    assert!(matches!(
        Propose::decode(Bytes::from(raw)),
        Err(secure_channel::CodecError::BadOffset { .. })
    ));
}

#[test]
fn test_unknown_union_discriminant_is_rejected() {
    let inner = GetNodes {
        version: 0,
        count: 16,
        listen_port: None,
    };
    let mut raw = DiscoveryMessage::GetNodes(inner).encode().to_vec();
    raw[0..4].copy_from_slice(&9u32.to_le_bytes());

    assert!(matches!(
        DiscoveryMessage::decode(Bytes::from(raw)),
        Err(secure_channel::CodecError::UnknownDiscriminant { value: 9, .. })
    ));
}

//! Handshake message types and their wire encodings.
//!
//! `Propose` and `Exchange` exist only for the duration of one handshake
//! attempt; after key derivation they are dropped and only the derived keys
//! persist in the connection state.

use bytes::Bytes;

use crate::core::wire::{self, Reader};
use crate::error::CodecError;

/// A peer's long-term public key: a closed, extensible tagged union.
///
/// Only the compressed secp256k1 encoding is defined today, but the wire
/// format reserves room for future variants; an unknown discriminant fails
/// decoding explicitly rather than coercing into an existing variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Secp256k1(Bytes),
}

impl PublicKey {
    const VARIANTS: usize = 1;

    /// Raw key bytes, without the union wrapper.
    pub fn raw(&self) -> &Bytes {
        let PublicKey::Secp256k1(raw) = self;
        raw
    }

    pub fn encode(&self) -> Bytes {
        let PublicKey::Secp256k1(raw) = self;
        wire::build_union(0, &wire::build_fixvec(raw))
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let (discriminant, payload) = Reader::new(buf, "PublicKey").union(Self::VARIANTS)?;
        debug_assert_eq!(discriminant, 0);
        Ok(PublicKey::Secp256k1(payload.fixvec()?))
    }
}

/// Handshake opening: random nonce, long-term public key, and the three
/// comma-joined ordered preference lists (most-preferred first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propose {
    pub rand: Bytes,
    pub pubkey: PublicKey,
    pub exchanges: String,
    pub ciphers: String,
    pub hashes: String,
}

impl Propose {
    const FIELDS: &'static [&'static str] = &[
        "Propose.rand",
        "Propose.pubkey",
        "Propose.exchanges",
        "Propose.ciphers",
        "Propose.hashes",
    ];

    pub fn encode(&self) -> Bytes {
        wire::build_table(&[
            wire::build_fixvec(&self.rand),
            self.pubkey.encode(),
            wire::build_fixvec(self.exchanges.as_bytes()),
            wire::build_fixvec(self.ciphers.as_bytes()),
            wire::build_fixvec(self.hashes.as_bytes()),
        ])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "Propose").table(Self::FIELDS)?;
        Ok(Propose {
            rand: fields[0].fixvec()?,
            pubkey: PublicKey::decode(fields[1].bytes())?,
            exchanges: fields[2].fixvec_str()?,
            ciphers: fields[3].fixvec_str()?,
            hashes: fields[4].fixvec_str()?,
        })
    }
}

/// Handshake second message: the ephemeral public key for key agreement plus
/// a signature binding it (and both `Propose` payloads) to the sender's
/// long-term identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub epubkey: Bytes,
    pub signature: Bytes,
}

impl Exchange {
    const FIELDS: &'static [&'static str] = &["Exchange.epubkey", "Exchange.signature"];

    pub fn encode(&self) -> Bytes {
        wire::build_table(&[
            wire::build_fixvec(&self.epubkey),
            wire::build_fixvec(&self.signature),
        ])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "Exchange").table(Self::FIELDS)?;
        Ok(Exchange {
            epubkey: fields[0].fixvec()?,
            signature: fields[1].fixvec()?,
        })
    }
}

//! Identify protocol message adapter.
//!
//! A peer announces its listen addresses, the address it observed the remote
//! peer dialing from, and an opaque capability blob. Pure wire translation;
//! what the upper layer does with the announcement is out of scope.

use bytes::Bytes;

use crate::core::wire::{self, Reader};
use crate::error::CodecError;

/// Raw address bytes; interpretation belongs to the caller.
pub type Address = Bytes;

/// Capability and address announcement exchanged after the channel is
/// established.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifyMessage {
    /// Addresses this peer listens on.
    pub listen_addrs: Vec<Address>,
    /// The address this peer observed the remote connecting from.
    pub observed_addr: Address,
    /// Opaque capability announcement.
    pub identify: Bytes,
}

impl IdentifyMessage {
    const FIELDS: &'static [&'static str] = &[
        "IdentifyMessage.listen_addrs",
        "IdentifyMessage.observed_addr",
        "IdentifyMessage.identify",
    ];

    pub fn encode(&self) -> Bytes {
        let listen_addrs: Vec<Bytes> = self
            .listen_addrs
            .iter()
            .map(|addr| wire::build_fixvec(addr))
            .collect();
        wire::build_table(&[
            wire::build_dynvec(&listen_addrs),
            wire::build_fixvec(&self.observed_addr),
            wire::build_fixvec(&self.identify),
        ])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "IdentifyMessage").table(Self::FIELDS)?;
        let listen_addrs = fields[0]
            .dynvec()?
            .iter()
            .map(Reader::fixvec)
            .collect::<Result<Vec<Bytes>, CodecError>>()?;
        Ok(IdentifyMessage {
            listen_addrs,
            observed_addr: fields[1].fixvec()?,
            identify: fields[2].fixvec()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_roundtrip() {
        let msg = IdentifyMessage {
            listen_addrs: vec![
                Bytes::from_static(b"/ip4/0.0.0.0/tcp/8115"),
                Bytes::from_static(b"/ip6/::/tcp/8115"),
            ],
            observed_addr: Bytes::from_static(b"/ip4/203.0.113.5/tcp/50211"),
            identify: Bytes::from_static(b"flags:0x03"),
        };
        assert_eq!(IdentifyMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn identify_minimal_roundtrip() {
        let msg = IdentifyMessage::default();
        let decoded = IdentifyMessage::decode(msg.encode()).unwrap();
        assert!(decoded.listen_addrs.is_empty());
        assert!(decoded.observed_addr.is_empty());
        assert!(decoded.identify.is_empty());
    }

    #[test]
    fn identify_truncation_is_error() {
        let encoded = IdentifyMessage {
            listen_addrs: vec![Bytes::from_static(b"/ip4/1.1.1.1/tcp/1")],
            observed_addr: Bytes::from_static(b"/ip4/2.2.2.2/tcp/2"),
            identify: Bytes::from_static(b"caps"),
        }
        .encode();

        for cut in 0..encoded.len() {
            assert!(IdentifyMessage::decode(encoded.slice(..cut)).is_err());
        }
    }
}

//! Discovery protocol message adapters.
//!
//! Pure (de)serialization wrappers over the wire primitives for the peer
//! address-exchange protocol. These carry no cryptographic state and run over
//! an established secure stream; address-book maintenance, peer scoring, and
//! trust policy all live above this layer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::wire::{self, Reader};
use crate::error::CodecError;

/// One peer's advertised addresses, as opaque byte strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub addresses: Vec<Bytes>,
}

impl Node {
    const FIELDS: &'static [&'static str] = &["Node.addresses"];

    pub fn encode(&self) -> Bytes {
        let addresses: Vec<Bytes> = self
            .addresses
            .iter()
            .map(|addr| wire::build_fixvec(addr))
            .collect();
        wire::build_table(&[wire::build_dynvec(&addresses)])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "Node").table(Self::FIELDS)?;
        let addresses = fields[0]
            .dynvec()?
            .iter()
            .map(Reader::fixvec)
            .collect::<Result<Vec<Bytes>, CodecError>>()?;
        Ok(Node { addresses })
    }
}

/// Request for peer addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNodes {
    /// Discovery protocol version.
    pub version: u32,
    /// How many nodes the requester wants.
    pub count: u32,
    /// The requester's advertised listen port, if it accepts inbound dials.
    pub listen_port: Option<u16>,
}

impl GetNodes {
    const FIELDS: &'static [&'static str] = &[
        "GetNodes.version",
        "GetNodes.count",
        "GetNodes.listen_port",
    ];

    pub fn encode(&self) -> Bytes {
        let mut version = BytesMut::with_capacity(4);
        version.put_u32_le(self.version);
        let mut count = BytesMut::with_capacity(4);
        count.put_u32_le(self.count);
        let port = wire::build_option(self.listen_port.map(|p| {
            let mut raw = BytesMut::with_capacity(2);
            raw.put_u16_le(p);
            raw.freeze()
        }));
        wire::build_table(&[version.freeze(), count.freeze(), port])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "GetNodes").table(Self::FIELDS)?;
        fields[0].fixed(4)?;
        fields[1].fixed(4)?;
        let listen_port = match fields[2].option() {
            Some(reader) => {
                reader.fixed(2)?;
                Some(reader.u16_le(0)?)
            }
            None => None,
        };
        Ok(GetNodes {
            version: fields[0].u32_le(0)?,
            count: fields[1].u32_le(0)?,
            listen_port,
        })
    }
}

/// Peer list payload. `announce` distinguishes a response to a `GetNodes`
/// request (`false`) from an unsolicited push (`true`); the upper layer sets
/// trust and rate-limit policy accordingly; the adapter only guarantees the
/// flag round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nodes {
    pub announce: bool,
    pub items: Vec<Node>,
}

impl Nodes {
    const FIELDS: &'static [&'static str] = &["Nodes.announce", "Nodes.items"];

    pub fn encode(&self) -> Bytes {
        let announce = Bytes::copy_from_slice(&[u8::from(self.announce)]);
        let items: Vec<Bytes> = self.items.iter().map(Node::encode).collect();
        wire::build_table(&[announce, wire::build_dynvec(&items)])
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let fields = Reader::new(buf, "Nodes").table(Self::FIELDS)?;
        fields[0].fixed(1)?;
        let announce = match fields[0].byte(0)? {
            0 => false,
            1 => true,
            value => {
                return Err(CodecError::UnknownDiscriminant {
                    field: "Nodes.announce",
                    value: value as u32,
                    variants: 2,
                })
            }
        };
        let items = fields[1]
            .dynvec()?
            .iter()
            .map(|item| Node::decode(item.bytes()))
            .collect::<Result<Vec<Node>, CodecError>>()?;
        Ok(Nodes { announce, items })
    }
}

/// Top-level discovery message: a closed union over the two payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMessage {
    GetNodes(GetNodes),
    Nodes(Nodes),
}

impl DiscoveryMessage {
    const VARIANTS: usize = 2;

    pub fn encode(&self) -> Bytes {
        match self {
            DiscoveryMessage::GetNodes(inner) => wire::build_union(0, &inner.encode()),
            DiscoveryMessage::Nodes(inner) => wire::build_union(1, &inner.encode()),
        }
    }

    pub fn decode(buf: Bytes) -> Result<Self, CodecError> {
        let (discriminant, payload) = Reader::new(buf, "DiscoveryMessage").union(Self::VARIANTS)?;
        match discriminant {
            0 => Ok(DiscoveryMessage::GetNodes(GetNodes::decode(payload.bytes())?)),
            _ => Ok(DiscoveryMessage::Nodes(Nodes::decode(payload.bytes())?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DISCOVERY_VERSION;

    #[test]
    fn get_nodes_roundtrip_with_port() {
        let msg = DiscoveryMessage::GetNodes(GetNodes {
            version: DISCOVERY_VERSION,
            count: 128,
            listen_port: Some(9000),
        });
        assert_eq!(DiscoveryMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn get_nodes_roundtrip_without_port() {
        let msg = DiscoveryMessage::GetNodes(GetNodes {
            version: DISCOVERY_VERSION,
            count: 0,
            listen_port: None,
        });
        assert_eq!(DiscoveryMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn nodes_response_roundtrip_exact() {
        let msg = Nodes {
            announce: false,
            items: vec![Node {
                addresses: vec![Bytes::from_static(b"/ip4/1.2.3.4/tcp/9000")],
            }],
        };
        let decoded = Nodes::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
        assert!(!decoded.announce);
        assert_eq!(
            &decoded.items[0].addresses[0][..],
            b"/ip4/1.2.3.4/tcp/9000"
        );
    }

    #[test]
    fn announce_flag_roundtrips_both_ways() {
        for announce in [false, true] {
            let msg = Nodes {
                announce,
                items: Vec::new(),
            };
            assert_eq!(Nodes::decode(msg.encode()).unwrap().announce, announce);
        }
    }

    #[test]
    fn announce_byte_out_of_range_rejected() {
        let bogus = wire::build_table(&[
            Bytes::from_static(&[7]),
            wire::build_dynvec(&[]),
        ]);
        let err = Nodes::decode(bogus).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnknownDiscriminant {
                field: "Nodes.announce",
                value: 7,
                ..
            }
        ));
    }

    #[test]
    fn nodes_maximal_roundtrip() {
        let msg = DiscoveryMessage::Nodes(Nodes {
            announce: true,
            items: (0..10)
                .map(|i| Node {
                    addresses: vec![
                        Bytes::from(format!("/ip4/10.0.0.{i}/tcp/8115")),
                        Bytes::from(format!("/ip6/::{i}/tcp/8115")),
                    ],
                })
                .collect(),
        });
        assert_eq!(DiscoveryMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn unknown_payload_discriminant_rejected() {
        let bogus = wire::build_union(2, &Bytes::new());
        assert!(matches!(
            DiscoveryMessage::decode(bogus).unwrap_err(),
            CodecError::UnknownDiscriminant {
                field: "DiscoveryMessage",
                value: 2,
                variants: 2,
            }
        ));
    }
}

//! Secure channel establishment for peer-to-peer connections.
//!
//! This crate implements a symmetric (no client/server role) handshake
//! that authenticates both peers, negotiates an algorithm suite, and
//! derives per-direction AEAD keys, plus the binary codec and peer
//! protocols that run over the resulting channel.
//!
//! ## Components
//!
//! - **Core**: length-prefixed framing and the self-describing wire
//!   format used by every protocol message.
//! - **Protocol**: handshake messages and state machine, algorithm
//!   negotiation, and the discovery / identify peer protocols.
//! - **Service**: the async driver that runs a handshake over any
//!   `AsyncRead + AsyncWrite` transport and the encrypted stream it
//!   produces.
//! - **Utils**: key material derivation, AEAD contexts, long-term
//!   identities, logging and deadline helpers.
//!
//! ## Security
//!
//! - Peers are authenticated by a signature over the full proposal
//!   transcript and the ephemeral key, so algorithm lists cannot be
//!   downgraded in flight.
//! - Session keys come from an ephemeral X25519 exchange; long-term
//!   keys only ever sign.
//! - A deterministic tie-break assigns key halves, and connecting to
//!   oneself is detected and rejected.
//!
//! ## Example
//!
//! ```no_run
//! use secure_channel::{handshake, ChannelConfig, Identity};
//!
//! # async fn run() -> secure_channel::Result<()> {
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:4001").await?;
//! let config = ChannelConfig::default();
//! let mut secure = handshake(stream, Identity::random(), &config).await?;
//! secure.send(b"hello").await?;
//! let reply = secure.recv().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use config::ChannelConfig;
pub use error::{CodecError, ProtocolError, Result};
pub use protocol::discovery::{DiscoveryMessage, GetNodes, Node, Nodes};
pub use protocol::handshake::{Handshake, HandshakeOutput, Negotiated, State};
pub use protocol::identify::IdentifyMessage;
pub use protocol::message::PublicKey;
pub use service::{handshake, SecureStream};
pub use utils::identity::Identity;

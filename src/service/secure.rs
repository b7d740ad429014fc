//! Async handshake driver and encrypted stream.
//!
//! [`handshake`] runs the state machine over any `AsyncRead + AsyncWrite`
//! transport using length-prefixed frames, under the configured deadline.
//! Success yields a [`SecureStream`] that seals every outgoing frame and
//! opens every incoming frame with the per-direction session keys.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::config::ChannelConfig;
use crate::core::codec::LengthCodec;
use crate::error::{ProtocolError, Result};
use crate::protocol::handshake::{Handshake, HandshakeOutput, Negotiated};
use crate::protocol::message::PublicKey;
use crate::utils::crypto::{Crypto, SessionKeys};
use crate::utils::identity::Identity;
use crate::utils::timeout::with_handshake_deadline;

/// Run the full handshake over `io`. Both sides call this symmetrically;
/// there is no client/server role. On timeout or any protocol failure the
/// connection is torn down and no partial state survives.
#[instrument(skip(io, identity, config), level = "debug")]
pub async fn handshake<T>(
    io: T,
    identity: Identity,
    config: &ChannelConfig,
) -> Result<SecureStream<T>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(io, LengthCodec::new(config.max_frame_size));

    let run = async {
        let mut machine = Handshake::new(identity, config);

        let propose = machine.propose()?;
        framed.send(propose).await?;
        let remote_propose = recv_frame(&mut framed).await?;

        let exchange = machine.on_propose(remote_propose)?;
        framed.send(exchange).await?;
        let remote_exchange = recv_frame(&mut framed).await?;

        let confirm = machine.on_exchange(remote_exchange)?;
        framed.send(confirm).await?;
        let remote_confirm = recv_frame(&mut framed).await?;

        machine.on_confirm(remote_confirm)
    };

    let output = with_handshake_deadline(run, config.handshake_timeout).await?;
    debug!(
        cipher = output.negotiated.cipher.name(),
        digest = output.negotiated.digest.name(),
        "handshake complete"
    );
    Ok(SecureStream::new(framed, output))
}

async fn recv_frame<T>(framed: &mut Framed<T, LengthCodec>) -> Result<Bytes>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    framed
        .next()
        .await
        .ok_or(ProtocolError::ConnectionClosed)?
}

/// An established, encrypted, authenticated byte-stream.
///
/// Frames are independent AEAD messages; tampering with any frame makes
/// `recv` fail and the connection should be dropped.
pub struct SecureStream<T> {
    framed: Framed<T, LengthCodec>,
    outbound: Crypto,
    inbound: Crypto,
    keys: SessionKeys,
    negotiated: Negotiated,
    remote_pubkey: PublicKey,
}

impl<T> SecureStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn new(framed: Framed<T, LengthCodec>, output: HandshakeOutput) -> Self {
        SecureStream {
            framed,
            outbound: output.outbound,
            inbound: output.inbound,
            keys: output.keys,
            negotiated: output.negotiated,
            remote_pubkey: output.remote_pubkey,
        }
    }

    /// Seal and send one frame.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let sealed = self.outbound.seal(data)?;
        self.framed.send(Bytes::from(sealed)).await
    }

    /// Receive and open one frame.
    pub async fn recv(&mut self) -> Result<Bytes> {
        let frame = self
            .framed
            .next()
            .await
            .ok_or(ProtocolError::ConnectionClosed)??;
        Ok(Bytes::from(self.inbound.open(&frame)?))
    }

    /// The remote peer's authenticated long-term public key.
    pub fn remote_public_key(&self) -> &PublicKey {
        &self.remote_pubkey
    }

    /// The agreed algorithm triple.
    pub fn negotiated(&self) -> Negotiated {
        self.negotiated
    }

    /// The derived directional key material (for callers that manage their
    /// own framing, e.g. a MAC-and-stream-cipher suite).
    pub fn session_keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Tear down the secure layer and recover the transport.
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}

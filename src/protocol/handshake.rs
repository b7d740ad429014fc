//! Handshake state machine.
//!
//! One [`Handshake`] drives one connection attempt from `Idle` to
//! `Established`. The machine is an explicit finite-state value with no I/O:
//! each step consumes the bytes received from the peer and returns the bytes
//! to send, so the whole protocol can be exercised with an injected transcript
//! and no network. The async driver in `service::secure` moves the frames.
//!
//! Transcript signature convention (protocol-versioned, both peers must
//! agree): each signer covers `own propose ‖ peer propose ‖ own ephemeral
//! public key`, so the verifier reconstructs `peer propose ‖ own propose ‖
//! received ephemeral key`.
//!
//! Any failure (decode, negotiation, authentication) moves the machine to
//! the terminal `Failed` state and releases all derived key material. A failed
//! handshake is never resumed; the caller opens a fresh connection.

use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, instrument, warn};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public};

use crate::config::{ChannelConfig, NONCE_SIZE};
use crate::error::{ProtocolError, Result};
use crate::protocol::message::{Exchange, Propose, PublicKey};
use crate::protocol::negotiate::{self, Reference};
use crate::utils::crypto::{stretch_keys, Cipher, Crypto, Digest, KeyExchange, SessionKeys};
use crate::utils::identity::{verify_signature, Identity};

/// Handshake progress for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    LocalProposeSent,
    RemoteProposeReceived,
    NegotiationDone,
    LocalExchangeSent,
    RemoteExchangeReceived,
    KeysDerived,
    Established,
    Failed,
}

impl State {
    pub fn name(self) -> &'static str {
        match self {
            State::Idle => "Idle",
            State::LocalProposeSent => "LocalProposeSent",
            State::RemoteProposeReceived => "RemoteProposeReceived",
            State::NegotiationDone => "NegotiationDone",
            State::LocalExchangeSent => "LocalExchangeSent",
            State::RemoteExchangeReceived => "RemoteExchangeReceived",
            State::KeysDerived => "KeysDerived",
            State::Established => "Established",
            State::Failed => "Failed",
        }
    }
}

/// The algorithm triple both peers agreed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub exchange: KeyExchange,
    pub cipher: Cipher,
    pub digest: Digest,
}

/// Everything a finished handshake hands to the caller. The live AEAD
/// contexts continue the nonce sequence started by the confirmation frames.
pub struct HandshakeOutput {
    pub keys: SessionKeys,
    pub negotiated: Negotiated,
    pub remote_pubkey: PublicKey,
    pub outbound: Crypto,
    pub inbound: Crypto,
}

/// Per-connection handshake state machine. Strictly sequential: one message
/// in, one message out, no overlapping steps.
pub struct Handshake {
    identity: Identity,
    exchanges: String,
    ciphers: String,
    digests: String,
    state: State,
    local_nonce: [u8; NONCE_SIZE],
    local_propose: Bytes,
    remote_propose: Option<Propose>,
    remote_propose_bytes: Option<Bytes>,
    reference: Option<Reference>,
    negotiated: Option<Negotiated>,
    ephemeral: Option<EphemeralSecret>,
    keys: Option<SessionKeys>,
    outbound: Option<Crypto>,
    inbound: Option<Crypto>,
}

impl Handshake {
    pub fn new(identity: Identity, config: &ChannelConfig) -> Self {
        Handshake {
            identity,
            exchanges: config.key_exchanges.clone(),
            ciphers: config.ciphers.clone(),
            digests: config.digests.clone(),
            state: State::Idle,
            local_nonce: [0u8; NONCE_SIZE],
            local_propose: Bytes::new(),
            remote_propose: None,
            remote_propose_bytes: None,
            reference: None,
            negotiated: None,
            ephemeral: None,
            keys: None,
            outbound: None,
            inbound: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Step 1: draw a fresh nonce and emit the local `Propose`.
    #[instrument(skip(self), level = "debug")]
    pub fn propose(&mut self) -> Result<Bytes> {
        self.step(|hs| {
            hs.expect(State::Idle)?;
            OsRng.fill_bytes(&mut hs.local_nonce);
            let propose = Propose {
                rand: Bytes::copy_from_slice(&hs.local_nonce),
                pubkey: hs.identity.public_key(),
                exchanges: hs.exchanges.clone(),
                ciphers: hs.ciphers.clone(),
                hashes: hs.digests.clone(),
            };
            hs.local_propose = propose.encode();
            hs.state = State::LocalProposeSent;
            debug!(len = hs.local_propose.len(), "propose sent");
            Ok(hs.local_propose.clone())
        })
    }

    /// Steps 2-4: take the remote `Propose`, negotiate the algorithm triple,
    /// and emit the signed local `Exchange`.
    #[instrument(skip(self, frame), level = "debug")]
    pub fn on_propose(&mut self, frame: Bytes) -> Result<Bytes> {
        self.step(|hs| hs.handle_propose(frame))
    }

    /// Step 5-6: verify the remote `Exchange`, derive session keys, and emit
    /// the key-confirmation frame (the peer's nonce under the new keys).
    #[instrument(skip(self, frame), level = "debug")]
    pub fn on_exchange(&mut self, frame: Bytes) -> Result<Bytes> {
        self.step(|hs| hs.handle_exchange(frame))
    }

    /// Step 7: check the peer's confirmation echoes our nonce; finish.
    #[instrument(skip(self, frame), level = "debug")]
    pub fn on_confirm(&mut self, frame: Bytes) -> Result<HandshakeOutput> {
        self.step(|hs| hs.handle_confirm(frame))
    }

    fn step<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                if self.state != State::Established {
                    self.abort();
                }
                Err(e)
            }
        }
    }

    fn expect(&self, state: State) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedState(self.state.name()))
        }
    }

    fn abort(&mut self) {
        self.state = State::Failed;
        self.ephemeral = None;
        // SessionKeys and stretched halves zeroize on drop.
        self.keys = None;
        self.outbound = None;
        self.inbound = None;
    }

    fn handle_propose(&mut self, frame: Bytes) -> Result<Bytes> {
        self.expect(State::LocalProposeSent)?;
        let remote = Propose::decode(frame.clone())?;
        self.state = State::RemoteProposeReceived;

        let local_pubkey = self.identity.public_key();
        let reference = negotiate::tie_break(
            local_pubkey.raw(),
            &self.local_nonce,
            remote.pubkey.raw(),
            &remote.rand,
        )?;
        let exchange_name =
            negotiate::select(reference, "exchange", &self.exchanges, &remote.exchanges)?;
        let cipher_name = negotiate::select(reference, "cipher", &self.ciphers, &remote.ciphers)?;
        let digest_name = negotiate::select(reference, "hash", &self.digests, &remote.hashes)?;

        let negotiated = Negotiated {
            exchange: KeyExchange::from_name(&exchange_name)
                .ok_or(ProtocolError::UnsupportedAlgorithm(exchange_name))?,
            cipher: Cipher::from_name(&cipher_name)
                .ok_or(ProtocolError::UnsupportedAlgorithm(cipher_name))?,
            digest: Digest::from_name(&digest_name)
                .ok_or(ProtocolError::UnsupportedAlgorithm(digest_name))?,
        };
        self.state = State::NegotiationDone;
        debug!(
            exchange = negotiated.exchange.name(),
            cipher = negotiated.cipher.name(),
            digest = negotiated.digest.name(),
            "negotiation complete"
        );

        let secret = EphemeralSecret::random_from_rng(OsRng);
        let epubkey = X25519Public::from(&secret).to_bytes();

        // Own propose first, then the peer's, then our ephemeral key.
        let mut corpus =
            Vec::with_capacity(self.local_propose.len() + frame.len() + epubkey.len());
        corpus.extend_from_slice(&self.local_propose);
        corpus.extend_from_slice(&frame);
        corpus.extend_from_slice(&epubkey);
        let signature = self.identity.sign(&corpus)?;

        let exchange = Exchange {
            epubkey: Bytes::copy_from_slice(&epubkey),
            signature: Bytes::from(signature),
        };

        self.remote_propose = Some(remote);
        self.remote_propose_bytes = Some(frame);
        self.reference = Some(reference);
        self.negotiated = Some(negotiated);
        self.ephemeral = Some(secret);
        self.state = State::LocalExchangeSent;
        Ok(exchange.encode())
    }

    fn handle_exchange(&mut self, frame: Bytes) -> Result<Bytes> {
        self.expect(State::LocalExchangeSent)?;
        let exchange = Exchange::decode(frame)?;

        let remote_propose = self
            .remote_propose
            .clone()
            .ok_or(ProtocolError::UnexpectedState("LocalExchangeSent"))?;
        let remote_bytes = self
            .remote_propose_bytes
            .clone()
            .ok_or(ProtocolError::UnexpectedState("LocalExchangeSent"))?;

        // The signer put its own propose first, so verification runs over
        // remote-then-local plus the ephemeral key it sent.
        let mut corpus = Vec::with_capacity(
            remote_bytes.len() + self.local_propose.len() + exchange.epubkey.len(),
        );
        corpus.extend_from_slice(&remote_bytes);
        corpus.extend_from_slice(&self.local_propose);
        corpus.extend_from_slice(&exchange.epubkey);

        if let Err(e) = verify_signature(&remote_propose.pubkey, &corpus, &exchange.signature) {
            warn!("exchange signature verification failed; possible tampering, aborting");
            return Err(e);
        }
        self.state = State::RemoteExchangeReceived;

        let negotiated = self
            .negotiated
            .ok_or(ProtocolError::UnexpectedState("RemoteExchangeReceived"))?;
        let reference = self
            .reference
            .ok_or(ProtocolError::UnexpectedState("RemoteExchangeReceived"))?;
        let remote_epub: [u8; 32] = exchange.epubkey.as_ref().try_into().map_err(|_| {
            ProtocolError::Crypto(format!(
                "ephemeral key must be 32 bytes, got {}",
                exchange.epubkey.len()
            ))
        })?;
        let secret = self
            .ephemeral
            .take()
            .ok_or(ProtocolError::UnexpectedState("RemoteExchangeReceived"))?;

        let shared = secret.diffie_hellman(&X25519Public::from(remote_epub));
        let (first, second) = stretch_keys(shared.as_bytes(), negotiated.cipher, negotiated.digest)?;
        // The tie-break winner takes the first half for its outbound traffic,
        // so both sides end up with mirror-image assignments.
        let (local_half, remote_half) = match reference {
            Reference::Local => (first, second),
            Reference::Remote => (second, first),
        };

        let mut outbound = Crypto::from_half(negotiated.cipher, &local_half)?;
        let inbound = Crypto::from_half(negotiated.cipher, &remote_half)?;
        self.keys = Some(SessionKeys {
            local: local_half,
            remote: remote_half,
        });
        self.state = State::KeysDerived;
        debug!("session keys derived");

        // Confirmation beat: echo the nonce the peer chose, under the new keys.
        let confirm = outbound.seal(&remote_propose.rand)?;
        self.outbound = Some(outbound);
        self.inbound = Some(inbound);
        Ok(Bytes::from(confirm))
    }

    fn handle_confirm(&mut self, frame: Bytes) -> Result<HandshakeOutput> {
        self.expect(State::KeysDerived)?;
        let mut inbound = self
            .inbound
            .take()
            .ok_or(ProtocolError::UnexpectedState("KeysDerived"))?;

        let echoed = match inbound.open(&frame) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                warn!("key confirmation frame failed to decrypt; derivation diverged or active attack");
                return Err(ProtocolError::KeyConfirmationFailed);
            }
        };
        if echoed.as_slice() != self.local_nonce {
            warn!("peer echoed a different nonce; session keys diverged");
            return Err(ProtocolError::KeyConfirmationFailed);
        }

        let outbound = self
            .outbound
            .take()
            .ok_or(ProtocolError::UnexpectedState("KeysDerived"))?;
        let keys = self
            .keys
            .take()
            .ok_or(ProtocolError::UnexpectedState("KeysDerived"))?;
        let negotiated = self
            .negotiated
            .ok_or(ProtocolError::UnexpectedState("KeysDerived"))?;
        let remote_pubkey = self
            .remote_propose
            .take()
            .map(|p| p.pubkey)
            .ok_or(ProtocolError::UnexpectedState("KeysDerived"))?;
        self.remote_propose_bytes = None;

        self.state = State::Established;
        debug!("secure channel established");
        Ok(HandshakeOutput {
            keys,
            negotiated,
            remote_pubkey,
            outbound,
            inbound,
        })
    }
}

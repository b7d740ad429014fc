//! Long-term identity keys.
//!
//! Each peer holds a persistent secp256k1 key pair used for exactly one
//! thing: signing the handshake transcript so the ephemeral exchange key is
//! bound to the peer's identity. The key pair is immutable for the process
//! lifetime and safe to share read-only across concurrent handshakes.

use bytes::Bytes;
use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message as SecpMessage, PublicKey as RawPublicKey, SecretKey, SECP256K1};
use sha2::{Digest as _, Sha256};

use crate::error::{ProtocolError, Result};
use crate::protocol::message::PublicKey;

/// A peer's long-term secp256k1 key pair.
#[derive(Clone)]
pub struct Identity {
    secret: SecretKey,
    public: RawPublicKey,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn random() -> Self {
        let (secret, public) = SECP256K1.generate_keypair(&mut OsRng);
        Identity { secret, public }
    }

    /// Restore an identity from 32 raw secret-key bytes.
    pub fn from_secret_bytes(raw: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(raw)
            .map_err(|e| ProtocolError::Crypto(format!("invalid secret key: {e}")))?;
        let public = secret.public_key(SECP256K1);
        Ok(Identity { secret, public })
    }

    /// The wire-encodable public half (compressed SEC1, 33 bytes).
    pub fn public_key(&self) -> PublicKey {
        PublicKey::Secp256k1(Bytes::copy_from_slice(&self.public.serialize()))
    }

    /// ECDSA-sign `data` (hashed with SHA-256), DER-encoded.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let message = digest_message(data)?;
        Ok(SECP256K1
            .sign_ecdsa(&message, &self.secret)
            .serialize_der()
            .to_vec())
    }
}

fn digest_message(data: &[u8]) -> Result<SecpMessage> {
    SecpMessage::from_digest_slice(&Sha256::digest(data))
        .map_err(|e| ProtocolError::Crypto(format!("digest rejected: {e}")))
}

/// Verify a DER signature over `data` against an encoded long-term public key.
///
/// Every parse or verification failure collapses to
/// [`ProtocolError::SignatureInvalid`]; the caller treats it as possible
/// tampering, not as a recoverable condition.
pub fn verify_signature(public: &PublicKey, data: &[u8], signature: &[u8]) -> Result<()> {
    let PublicKey::Secp256k1(raw) = public;
    let key = RawPublicKey::from_slice(raw).map_err(|_| ProtocolError::SignatureInvalid)?;
    let sig = Signature::from_der(signature).map_err(|_| ProtocolError::SignatureInvalid)?;
    let message = digest_message(data)?;
    SECP256K1
        .verify_ecdsa(&message, &sig, &key)
        .map_err(|_| ProtocolError::SignatureInvalid)
}

//! Cryptographic primitives for the negotiated session.
//!
//! Covers the algorithm registry (what the negotiation identifiers map to),
//! the HMAC-based key stretch that turns the ECDH shared secret into
//! directional key material, and the AEAD contexts that seal post-handshake
//! frames.
//!
//! Key material hygiene: stretched halves are zeroized on drop.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ProtocolError, Result};

/// AEAD nonce length in bytes.
pub const IV_SIZE: usize = 12;

/// Per-direction MAC key length in bytes.
pub const MAC_KEY_SIZE: usize = 32;

/// Identifiers accepted in a key-exchange preference list. `P256` is valid to
/// propose and negotiate but has no implemented primitive yet; negotiating it
/// yields [`ProtocolError::UnsupportedAlgorithm`].
pub const KNOWN_EXCHANGES: &[&str] = &["X25519", "P256"];

/// Identifiers accepted in a cipher preference list.
pub const KNOWN_CIPHERS: &[&str] = &["AES256", "AES128"];

/// Identifiers accepted in a hash preference list.
pub const KNOWN_DIGESTS: &[&str] = &["SHA256", "SHA512"];

/// Key-agreement primitives with an implementation behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchange {
    X25519,
}

impl KeyExchange {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "X25519" => Some(KeyExchange::X25519),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyExchange::X25519 => "X25519",
        }
    }
}

/// Symmetric ciphers (AES-GCM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Aes128,
    Aes256,
}

impl Cipher {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AES128" => Some(Cipher::Aes128),
            "AES256" => Some(Cipher::Aes256),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Cipher::Aes128 => "AES128",
            Cipher::Aes256 => "AES256",
        }
    }

    pub fn key_size(self) -> usize {
        match self {
            Cipher::Aes128 => 16,
            Cipher::Aes256 => 32,
        }
    }
}

/// Hash functions used for the tie-break and the key stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    Sha256,
    Sha512,
}

impl Digest {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA256" => Some(Digest::Sha256),
            "SHA512" => Some(Digest::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Digest::Sha256 => "SHA256",
            Digest::Sha512 => "SHA512",
        }
    }
}

/// One direction's worth of stretched key material.
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct KeyHalf {
    pub iv: Vec<u8>,
    pub cipher_key: Vec<u8>,
    pub mac_key: Vec<u8>,
}

/// The two directional halves a finished handshake hands to the caller.
/// `local` keys outbound traffic; `remote` keys inbound traffic.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub local: KeyHalf,
    pub remote: KeyHalf,
}

macro_rules! expand_with {
    ($hash:ty, $secret:expr, $need:expr) => {{
        let secret: &[u8] = $secret;
        let need: usize = $need;
        let seed: &[u8] = b"key expansion";

        let mut mac = <Hmac<$hash> as Mac>::new_from_slice(secret)
            .map_err(|e| ProtocolError::Crypto(e.to_string()))?;
        mac.update(seed);
        let mut feedback = mac.finalize().into_bytes().to_vec();

        let mut out = Vec::with_capacity(need);
        while out.len() < need {
            let mut mac = <Hmac<$hash> as Mac>::new_from_slice(secret)
                .map_err(|e| ProtocolError::Crypto(e.to_string()))?;
            mac.update(&feedback);
            mac.update(seed);
            let block = mac.finalize().into_bytes();
            let take = block.len().min(need - out.len());
            out.extend_from_slice(&block[..take]);

            let mut mac = <Hmac<$hash> as Mac>::new_from_slice(secret)
                .map_err(|e| ProtocolError::Crypto(e.to_string()))?;
            mac.update(&feedback);
            feedback = mac.finalize().into_bytes().to_vec();
        }
        feedback.zeroize();
        Ok::<Vec<u8>, ProtocolError>(out)
    }};
}

fn hmac_expand(secret: &[u8], digest: Digest, need: usize) -> Result<Vec<u8>> {
    match digest {
        Digest::Sha256 => expand_with!(Sha256, secret, need),
        Digest::Sha512 => expand_with!(Sha512, secret, need),
    }
}

/// Stretch the ECDH shared secret into two equal halves, each
/// `iv ‖ cipher_key ‖ mac_key`. Which peer takes which half is decided by the
/// negotiation tie-break, so both sides end up with mirror-image assignments.
pub fn stretch_keys(secret: &[u8], cipher: Cipher, digest: Digest) -> Result<(KeyHalf, KeyHalf)> {
    let half = IV_SIZE + cipher.key_size() + MAC_KEY_SIZE;
    let mut stretched = hmac_expand(secret, digest, 2 * half)?;
    let first = split_half(&stretched[..half], cipher);
    let second = split_half(&stretched[half..], cipher);
    stretched.zeroize();
    Ok((first, second))
}

fn split_half(raw: &[u8], cipher: Cipher) -> KeyHalf {
    let (iv, rest) = raw.split_at(IV_SIZE);
    let (cipher_key, mac_key) = rest.split_at(cipher.key_size());
    KeyHalf {
        iv: iv.to_vec(),
        cipher_key: cipher_key.to_vec(),
        mac_key: mac_key.to_vec(),
    }
}

enum AeadCipher {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// One direction's AEAD context: a cipher instance, the stretched IV, and a
/// message counter. Nonces are the IV with the counter folded into the low
/// eight bytes, so a key/IV pair never seals two frames under the same nonce.
pub struct Crypto {
    aead: AeadCipher,
    iv: [u8; IV_SIZE],
    seq: u64,
}

impl Crypto {
    pub fn new(cipher: Cipher, key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != IV_SIZE {
            return Err(ProtocolError::Crypto(format!(
                "IV must be {IV_SIZE} bytes, got {}",
                iv.len()
            )));
        }
        let aead = match cipher {
            Cipher::Aes128 => AeadCipher::Aes128(Box::new(
                Aes128Gcm::new_from_slice(key)
                    .map_err(|_| ProtocolError::Crypto("bad AES-128 key length".to_string()))?,
            )),
            Cipher::Aes256 => AeadCipher::Aes256(Box::new(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|_| ProtocolError::Crypto("bad AES-256 key length".to_string()))?,
            )),
        };
        let mut fixed = [0u8; IV_SIZE];
        fixed.copy_from_slice(iv);
        Ok(Crypto {
            aead,
            iv: fixed,
            seq: 0,
        })
    }

    pub fn from_half(cipher: Cipher, half: &KeyHalf) -> Result<Self> {
        Self::new(cipher, &half.cipher_key, &half.iv)
    }

    fn next_nonce(&mut self) -> [u8; IV_SIZE] {
        let mut nonce = self.iv;
        for (byte, ctr) in nonce[IV_SIZE - 8..].iter_mut().zip(self.seq.to_le_bytes()) {
            *byte ^= ctr;
        }
        self.seq = self.seq.wrapping_add(1);
        nonce
    }

    /// Encrypt and authenticate one frame.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = self.next_nonce();
        match &self.aead {
            AeadCipher::Aes128(aead) => aead.encrypt(Nonce::from_slice(&nonce_bytes), plaintext),
            AeadCipher::Aes256(aead) => aead.encrypt(Nonce::from_slice(&nonce_bytes), plaintext),
        }
        .map_err(|_| ProtocolError::Crypto("AEAD seal failed".to_string()))
    }

    /// Decrypt and verify one frame. Fails on any tampering.
    pub fn open(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce_bytes = self.next_nonce();
        match &self.aead {
            AeadCipher::Aes128(aead) => aead.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext),
            AeadCipher::Aes256(aead) => aead.decrypt(Nonce::from_slice(&nonce_bytes), ciphertext),
        }
        .map_err(|_| ProtocolError::Crypto("AEAD open failed".to_string()))
    }
}

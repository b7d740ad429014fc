//! # Utility Modules
//!
//! Supporting utilities for cryptography, identity keys, logging, and timing.
//!
//! ## Components
//! - **Crypto**: negotiated-algorithm registry, key stretching, AEAD sealing
//! - **Identity**: long-term secp256k1 key pairs and transcript signatures
//! - **Logging**: structured logging configuration
//! - **Timeout**: async timeout wrapper and default durations
//!
//! ## Security
//! - Cryptographically secure RNG (`rand::rngs::OsRng`)
//! - Memory zeroing for derived key material (zeroize crate)

pub mod crypto;
pub mod identity;
pub mod logging;
pub mod timeout;

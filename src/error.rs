//! # Error Types
//!
//! Comprehensive error handling for the secure-channel core.
//!
//! This module defines all error variants that can occur while establishing or
//! using a secure channel, from low-level decode failures to authentication
//! violations.
//!
//! ## Error Categories
//! - **Codec errors**: truncated buffers, bad offsets, count mismatches,
//!   unknown union discriminants. Always recoverable and attributable to
//!   the field that failed.
//! - **Negotiation errors**: no mutually supported algorithm, self-connection.
//! - **Authentication errors**: signature or key-confirmation failures.
//!   Fatal for the connection, never retried.
//! - **Resource errors**: timeouts and closed connections mid-handshake.
//!
//! No error category triggers a retry inside the core; retry policy belongs to
//! the caller, layered on a fresh connection.

use std::io;
use thiserror::Error;

/// Structural decode failure, attributed to the wire field that failed.
///
/// The codec only guarantees structural well-formedness: a buffer that decodes
/// cleanly may still carry domain-invalid data (e.g. a byte string that is not
/// a valid public key); that validation belongs to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated buffer in `{field}`: need {needed} bytes, have {have}")]
    Truncated {
        field: &'static str,
        needed: usize,
        have: usize,
    },

    #[error("offset out of range in `{field}`: {offset} exceeds buffer of {len} bytes")]
    BadOffset {
        field: &'static str,
        offset: usize,
        len: usize,
    },

    #[error("count mismatch in `{field}`: declared {declared}, actual {actual}")]
    CountMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("unknown union discriminant in `{field}`: {value} (only {variants} variants)")]
    UnknownDiscriminant {
        field: &'static str,
        value: u32,
        variants: usize,
    },

    #[error("invalid UTF-8 in `{field}`")]
    InvalidUtf8 { field: &'static str },
}

/// Primary error type for all secure-channel operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no common {0} algorithm between peers")]
    NoCommonAlgorithm(&'static str),

    #[error("peer proposed our own key and nonce (connected to self)")]
    ConnectSelf,

    #[error("exchange signature verification failed")]
    SignatureInvalid,

    #[error("key confirmation failed: peers derived different session keys")]
    KeyConfirmationFailed,

    #[error("negotiated algorithm `{0}` is not implemented")]
    UnsupportedAlgorithm(String),

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("message not permitted in state `{0}`")]
    UnexpectedState(&'static str),

    #[error("frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

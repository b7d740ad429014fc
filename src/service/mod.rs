//! Connection-level services built on the protocol layer.
//!
//! ## Components
//!
//! - [`secure`]: the async handshake driver and [`secure::SecureStream`],
//!   which carry a negotiated, authenticated, encrypted frame stream over
//!   any `AsyncRead + AsyncWrite` transport.

pub mod secure;

pub use secure::{handshake, SecureStream};

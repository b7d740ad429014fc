//! # Protocol Layer
//!
//! Typed messages and the logic that drives them.
//!
//! ## Components
//! - **Message**: `Propose`, `Exchange`, `PublicKey` wire types
//! - **Negotiate**: symmetric algorithm selection with an order-independent
//!   tie-break
//! - **Handshake**: the per-connection finite-state machine
//! - **Discovery / Identify**: adapter message types consumed by the upper
//!   layers after the channel is established

pub mod discovery;
pub mod handshake;
pub mod identify;
pub mod message;
pub mod negotiate;

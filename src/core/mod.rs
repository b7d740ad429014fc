//! # Core Wire Components
//!
//! Low-level binary serialization and frame handling.
//!
//! This module provides the foundation the protocol layers build on: the
//! bounds-checked wire primitives (fixed arrays, fixvecs, dynvecs, tables,
//! unions, options) and the length-prefixed frame codec for byte streams.
//!
//! ## Components
//! - **Wire**: encode/decode primitives with per-field error attribution
//! - **Codec**: tokio codec for framing over byte streams
//!
//! ## Security
//! - Frame length validated before allocation (prevents memory exhaustion)
//! - Every offset and count bounds-checked; declared sizes are never trusted

pub mod codec;
pub mod wire;

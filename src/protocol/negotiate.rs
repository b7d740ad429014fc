//! Symmetric algorithm negotiation.
//!
//! Both peers run this pure function over the same inputs (both nonces, both
//! public keys, both preference lists) and arrive at the same result no
//! matter which messages arrived first. That order-independence is what makes
//! simultaneous handshake initiation race-free: there is no "first sender
//! wins" rule to race on.

use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};

/// Which peer's preference list is authoritative for this handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Local,
    Remote,
}

/// Symmetry-breaking tie-break.
///
/// Each peer is scored by `SHA-256(its pubkey ‖ the other peer's nonce)`; the
/// byte-lexicographically smaller score wins the reference role. Both sides
/// compute both scores from data they both hold, so the outcome is identical
/// on both ends. Equal scores can only happen when a peer dialed itself.
pub fn tie_break(
    local_pubkey: &[u8],
    local_nonce: &[u8],
    remote_pubkey: &[u8],
    remote_nonce: &[u8],
) -> Result<Reference> {
    let local_score = score(local_pubkey, remote_nonce);
    let remote_score = score(remote_pubkey, local_nonce);

    match local_score.cmp(&remote_score) {
        std::cmp::Ordering::Less => Ok(Reference::Local),
        std::cmp::Ordering::Greater => Ok(Reference::Remote),
        std::cmp::Ordering::Equal => Err(ProtocolError::ConnectSelf),
    }
}

fn score(pubkey: &[u8], nonce: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(pubkey);
    hasher.update(nonce);
    hasher.finalize().into()
}

/// Select the agreed algorithm for one category.
///
/// Walks the reference peer's comma-joined list in order and picks the first
/// entry also present in the other peer's list. Disjoint lists fail with
/// [`ProtocolError::NoCommonAlgorithm`] naming the category, never a partial
/// or implicit default.
pub fn select(reference: Reference, kind: &'static str, local: &str, remote: &str) -> Result<String> {
    let (primary, secondary) = match reference {
        Reference::Local => (local, remote),
        Reference::Remote => (remote, local),
    };

    for candidate in entries(primary) {
        if entries(secondary).any(|other| other == candidate) {
            return Ok(candidate.to_string());
        }
    }
    Err(ProtocolError::NoCommonAlgorithm(kind))
}

fn entries(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

//! # Configuration Management
//!
//! Centralized configuration for the secure-channel layer.
//!
//! This module provides protocol constants and the [`ChannelConfig`] structure
//! controlling algorithm proposals, handshake timeout, and frame limits.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Direct instantiation with defaults
//!
//! ## Security Considerations
//! - Preference lists are ordered most-preferred first; negotiation never
//!   falls back to an algorithm outside the configured lists
//! - The handshake timeout bounds how long a peer can stall mid-handshake

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ProtocolError, Result};
use crate::utils::crypto::{KNOWN_CIPHERS, KNOWN_DIGESTS, KNOWN_EXCHANGES};
use crate::utils::timeout;

/// Version carried in discovery `GetNodes` requests.
pub const DISCOVERY_VERSION: u32 = 0;

/// Size of the random nonce carried in `Propose`.
pub const NONCE_SIZE: usize = 16;

/// Max allowed frame payload size (8 MB).
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Default key-exchange proposal, most-preferred first.
pub const DEFAULT_KEY_EXCHANGES: &str = "X25519";

/// Default cipher proposal, most-preferred first.
pub const DEFAULT_CIPHERS: &str = "AES256,AES128";

/// Default hash proposal, most-preferred first.
pub const DEFAULT_DIGESTS: &str = "SHA256,SHA512";

/// Per-connection channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Comma-joined key-exchange preference list.
    pub key_exchanges: String,

    /// Comma-joined cipher preference list.
    pub ciphers: String,

    /// Comma-joined hash preference list.
    pub digests: String,

    /// Hard deadline for the whole handshake.
    #[serde(with = "duration_serde")]
    pub handshake_timeout: Duration,

    /// Maximum allowed frame payload size in bytes.
    pub max_frame_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            key_exchanges: DEFAULT_KEY_EXCHANGES.to_string(),
            ciphers: DEFAULT_CIPHERS.to_string(),
            digests: DEFAULT_DIGESTS.to_string(),
            handshake_timeout: timeout::HANDSHAKE_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ChannelConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        validate_list("key_exchanges", &self.key_exchanges, KNOWN_EXCHANGES, &mut errors);
        validate_list("ciphers", &self.ciphers, KNOWN_CIPHERS, &mut errors);
        validate_list("digests", &self.digests, KNOWN_DIGESTS, &mut errors);

        if self.handshake_timeout.as_millis() < 100 {
            errors.push("Handshake timeout too short (minimum: 100ms)".to_string());
        } else if self.handshake_timeout.as_secs() > 300 {
            errors.push("Handshake timeout too long (maximum: 300s)".to_string());
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 64 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: 64 MB)",
                self.max_frame_size
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn validate_list(name: &str, list: &str, known: &[&str], errors: &mut Vec<String>) {
    let entries: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if entries.is_empty() {
        errors.push(format!("Preference list `{name}` cannot be empty"));
        return;
    }

    for entry in entries {
        if !known.contains(&entry) {
            errors.push(format!(
                "Unknown algorithm `{entry}` in `{name}` (known: {})",
                known.join(", ")
            ));
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

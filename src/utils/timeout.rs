//! Async timeout helpers shared by the handshake driver.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Default timeout for individual network operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Hard deadline for a complete handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a handshake future under a deadline. Expiry surfaces as
/// [`ProtocolError::HandshakeTimeout`]; the caller tears the connection
/// down and may retry on a fresh one.
pub async fn with_handshake_deadline<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::HandshakeTimeout),
    }
}

//! Source trait for frame streams

use crate::Result;
use crate::protocol::ControlToken;

/// Bidirectional endpoint that emits frame messages and accepts control tokens
///
/// Sources abstract over the transport (a websocket, an in-process channel).
/// They do not decode frames; decoding belongs to the ingestor so that a bad
/// message never tears the transport down.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next text message
    ///
    /// Returns:
    /// - `Ok(Some(text))` - Message received
    /// - `Ok(None)` - Peer closed the stream (normal termination)
    /// - `Err(e)` - Transport failure
    async fn next_message(&mut self) -> Result<Option<String>>;

    /// Send a plain-text control token to the peer
    async fn send_control(&mut self, token: ControlToken) -> Result<()>;

    /// Close the transport
    ///
    /// Closing an already-closed source succeeds.
    async fn close(&mut self) -> Result<()>;

    /// Human-readable description for logs, e.g. the URL
    fn describe(&self) -> String;
}

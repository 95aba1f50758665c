//! In-process source backed by tokio channels
//!
//! Useful for embedding a local simulator and for driving sessions in tests.
//! The [`ChannelPeer`] half plays the server: it sends frame messages and
//! receives the client's control tokens.

use tokio::sync::mpsc;

use crate::protocol::{ControlToken, encode_frame};
use crate::source::FrameSource;
use crate::types::Frame;
use crate::{Result, StreamError};

enum PeerEvent {
    Message(String),
    Failure(String),
}

/// Client half of an in-process stream
pub struct ChannelSource {
    inbound: mpsc::UnboundedReceiver<PeerEvent>,
    outbound: mpsc::UnboundedSender<ControlToken>,
    closed: bool,
}

/// Server half of an in-process stream
pub struct ChannelPeer {
    outbound: mpsc::UnboundedSender<PeerEvent>,
    inbound: mpsc::UnboundedReceiver<ControlToken>,
}

impl ChannelSource {
    /// Create a connected source and peer
    pub fn pair() -> (ChannelSource, ChannelPeer) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        (
            ChannelSource { inbound: message_rx, outbound: control_tx, closed: false },
            ChannelPeer { outbound: message_tx, inbound: control_rx },
        )
    }
}

impl ChannelPeer {
    /// Send a raw text message
    ///
    /// Returns `false` once the client has closed.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.outbound.send(PeerEvent::Message(text.into())).is_ok()
    }

    /// Encode and send a frame
    pub fn send_frame(&self, frame: &Frame) -> Result<bool> {
        Ok(self.send_text(encode_frame(frame)?))
    }

    /// Simulate a transport failure; the client sees an error on its next read
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.outbound.send(PeerEvent::Failure(reason.into()));
    }

    /// Wait for the next control token from the client
    ///
    /// Returns `None` once the client has dropped its half.
    pub async fn recv_control(&mut self) -> Option<ControlToken> {
        self.inbound.recv().await
    }

    /// Take a control token if one is already queued
    pub fn try_recv_control(&mut self) -> Option<ControlToken> {
        self.inbound.try_recv().ok()
    }
}

#[async_trait::async_trait]
impl FrameSource for ChannelSource {
    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }
        match self.inbound.recv().await {
            Some(PeerEvent::Message(text)) => Ok(Some(text)),
            Some(PeerEvent::Failure(reason)) => Err(StreamError::connection_failed(reason)),
            None => Ok(None),
        }
    }

    async fn send_control(&mut self, token: ControlToken) -> Result<()> {
        if self.closed {
            return Err(StreamError::SessionClosed);
        }
        self.outbound
            .send(token)
            .map_err(|_| StreamError::connection_failed("channel peer hung up"))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.inbound.close();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-process channel".to_string()
    }
}

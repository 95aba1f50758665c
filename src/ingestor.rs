//! Ingestor: decodes inbound messages into the frame buffer and acknowledges them
//!
//! Every decoded frame is appended to the buffer and then acknowledged with
//! `ok`. The server waits for that acknowledgment before computing the next
//! step, so the client alone sets the production rate.

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::buffer::{self, PushOutcome, SharedFrameBuffer};
use crate::protocol::{ControlToken, decode_frame};
use crate::source::FrameSource;
use crate::types::ConnectionState;

/// Counters for the producer side of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub received: u64,
    pub decoded: u64,
    pub malformed: u64,
    pub acknowledged: u64,
    /// Particle count of the first decoded frame
    pub particle_count: Option<usize>,
    /// Simulator instance reported by the server
    pub simulator_id: Option<u64>,
}

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Decoded and appended (possibly evicting or being refused by a bounded buffer)
    Buffered(PushOutcome),
    /// Dropped because it did not decode
    Malformed,
    /// Dropped because the session is closing
    Closed,
}

/// Producer half of a session
pub struct FrameIngestor<S: FrameSource> {
    source: S,
    buffer: SharedFrameBuffer,
    ack_malformed: bool,
    state: watch::Sender<ConnectionState>,
    stats: watch::Sender<IngestStats>,
    cancel: CancellationToken,
}

impl<S: FrameSource> FrameIngestor<S> {
    pub fn new(
        source: S,
        buffer: SharedFrameBuffer,
        ack_malformed: bool,
        state: watch::Sender<ConnectionState>,
        stats: watch::Sender<IngestStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self { source, buffer, ack_malformed, state, stats, cancel }
    }

    /// Handle one inbound message
    ///
    /// Decode failures are logged and dropped without touching the buffer.
    /// Only a failure to send the acknowledgment is returned as an error.
    pub async fn handle_message(&mut self, text: &str) -> Result<IngestOutcome> {
        self.stats.send_modify(|stats| stats.received += 1);

        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, bytes = text.len(), "Dropping malformed frame message");
                self.stats.send_modify(|stats| stats.malformed += 1);
                if self.ack_malformed {
                    self.acknowledge().await?;
                }
                return Ok(IngestOutcome::Malformed);
            }
        };

        let time = frame.time;
        let particles = frame.particle_count();
        let simulator_id = frame.simulator_id;

        let outcome = buffer::lock(&self.buffer).push(frame);
        if outcome == PushOutcome::Closed {
            debug!(time, "Session closing, frame discarded");
            return Ok(IngestOutcome::Closed);
        }

        self.stats.send_modify(|stats| {
            stats.decoded += 1;
            if stats.particle_count.is_none() {
                stats.particle_count = Some(particles);
            }
            if simulator_id.is_some() {
                stats.simulator_id = simulator_id;
            }
        });

        match outcome {
            PushOutcome::QueuedWithEviction => debug!(time, "Buffer full, evicted oldest frame"),
            PushOutcome::Rejected => debug!(time, "Buffer full, refused incoming frame"),
            _ => trace!(time, particles, "Frame buffered"),
        }

        // Refused frames are still acknowledged so the pull loop keeps moving.
        self.acknowledge().await?;
        Ok(IngestOutcome::Buffered(outcome))
    }

    async fn acknowledge(&mut self) -> Result<()> {
        self.source.send_control(ControlToken::Ack).await?;
        self.stats.send_modify(|stats| stats.acknowledged += 1);
        Ok(())
    }

    /// Read messages until the peer goes away or the session is cancelled
    pub async fn run(mut self) -> IngestStats {
        info!(source = %self.source.describe(), "Frame ingestor started");

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.shutdown().await;
                    break;
                }
                result = self.source.next_message() => result,
            };

            match result {
                Ok(Some(text)) => {
                    if let Err(e) = self.handle_message(&text).await {
                        error!(error = %e, "Failed to acknowledge frame");
                        self.disconnected();
                        break;
                    }
                }
                Ok(None) => {
                    info!("Server closed the frame stream");
                    self.disconnected();
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Frame source failed");
                    self.disconnected();
                    break;
                }
            }
        }

        let stats = *self.stats.borrow();
        info!(
            decoded = stats.decoded,
            malformed = stats.malformed,
            "Frame ingestor ended"
        );
        stats
    }

    /// Explicit close: announce it to the server, then hang up
    async fn shutdown(&mut self) {
        debug!("Ingestor cancelled, closing source");
        if let Err(e) = self.source.send_control(ControlToken::Close).await {
            debug!(error = %e, "Could not send close token");
        }
        if let Err(e) = self.source.close().await {
            debug!(error = %e, "Error while closing source");
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Unexpected end: keep buffered frames so playback can drain them
    fn disconnected(&mut self) {
        buffer::lock(&self.buffer).mark_source_ended();
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

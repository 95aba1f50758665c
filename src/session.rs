//! Streaming session: one socket, one buffer, one ingestor, one scheduler

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::buffer::{self, BufferStats, FrameBuffer, SharedFrameBuffer};
use crate::config::{ClientConfig, EndpointConfig, PlaybackConfig};
use crate::ingestor::{FrameIngestor, IngestStats};
use crate::scheduler::{PlaybackScheduler, PlaybackStatus};
use crate::sink::SceneSink;
use crate::source::FrameSource;
use crate::sources::WebSocketSource;
use crate::stream::SampleExt;
use crate::types::{ConnectionState, UpdateRate};

/// A live visualization session
///
/// Owns the frame buffer shared by the ingestor and scheduler tasks. Nothing
/// is shared with other sessions; reconnecting means starting a new one.
/// Dropping a session cancels both tasks.
pub struct Session {
    source: String,
    buffer: SharedFrameBuffer,
    cancel: CancellationToken,
    state: watch::Receiver<ConnectionState>,
    status: watch::Receiver<PlaybackStatus>,
    ingest: watch::Receiver<IngestStats>,
    ingestor: Option<JoinHandle<IngestStats>>,
    scheduler: Option<JoinHandle<PlaybackStatus>>,
}

impl Session {
    /// Connect to a simulation server and start playback into `sink`
    pub async fn connect<K>(
        endpoint: &EndpointConfig,
        playback: PlaybackConfig,
        sink: K,
    ) -> Result<Self>
    where
        K: SceneSink,
    {
        playback.validate()?;
        let source = WebSocketSource::connect(endpoint).await?;
        Self::start(source, playback, sink)
    }

    /// Connect using a complete client configuration
    pub async fn from_config<K>(config: &ClientConfig, sink: K) -> Result<Self>
    where
        K: SceneSink,
    {
        Self::connect(&config.endpoint, config.playback.clone(), sink).await
    }

    /// Start a session over an already-open source
    ///
    /// Spawns the ingestor and scheduler tasks, so this must be called from
    /// within a tokio runtime.
    pub fn start<S, K>(source: S, playback: PlaybackConfig, sink: K) -> Result<Self>
    where
        S: FrameSource,
        K: SceneSink,
    {
        playback.validate()?;

        let description = source.describe();
        let buffer = FrameBuffer::shared(playback.overflow);
        let cancel = CancellationToken::new();

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let (ingest_tx, ingest_rx) = watch::channel(IngestStats::default());

        let ingestor = FrameIngestor::new(
            source,
            buffer.clone(),
            playback.ack_malformed,
            state_tx,
            ingest_tx,
            cancel.clone(),
        );
        let scheduler =
            PlaybackScheduler::new(buffer.clone(), sink, playback, status_tx, cancel.clone());

        let ingestor = tokio::spawn(ingestor.run());
        let scheduler = tokio::spawn(scheduler.run());

        info!(source = %description, "Session started");

        Ok(Self {
            source: description,
            buffer,
            cancel,
            state: state_rx,
            status: status_rx,
            ingest: ingest_rx,
            ingestor: Some(ingestor),
            scheduler: Some(scheduler),
        })
    }

    /// Close the session
    ///
    /// Refuses further frames, sends `close` to the server, closes the socket,
    /// stops the scheduler and empties the buffer. Returns once both tasks
    /// have finished. Closing twice is a no-op.
    pub async fn close(&mut self) {
        if self.is_closed() {
            debug!(source = %self.source, "Session already closed");
            return;
        }

        buffer::lock(&self.buffer).close();
        self.cancel.cancel();

        if let Some(handle) = self.ingestor.take() {
            match handle.await {
                Ok(stats) => debug!(decoded = stats.decoded, "Ingestor joined"),
                Err(e) => warn!(error = %e, "Ingestor task failed"),
            }
        }
        if let Some(handle) = self.scheduler.take() {
            match handle.await {
                Ok(status) => debug!(presented = status.presented, "Scheduler joined"),
                Err(e) => warn!(error = %e, "Scheduler task failed"),
            }
        }

        info!(source = %self.source, "Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Connection state changes, starting with the current state
    pub fn state_updates(&self) -> impl Stream<Item = ConnectionState> + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Wait until the session is disconnected, by either side
    pub async fn disconnected(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|state| !state.is_connected()).await;
    }

    /// Latest playback snapshot
    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    /// Playback snapshots, starting with the current one
    pub fn status_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = PlaybackStatus> + 'static {
        let updates = WatchStream::new(self.status.clone());
        match rate.sample_interval() {
            None => updates.boxed(),
            Some(period) => updates.sample_every(period).boxed(),
        }
    }

    pub fn ingest_stats(&self) -> IngestStats {
        *self.ingest.borrow()
    }

    /// Particle count fixed by the first frame of the session
    pub fn particle_count(&self) -> Option<usize> {
        self.ingest.borrow().particle_count
    }

    /// Frames waiting to be presented
    pub fn buffered_frames(&self) -> usize {
        buffer::lock(&self.buffer).len()
    }

    pub fn buffer_stats(&self) -> BufferStats {
        buffer::lock(&self.buffer).stats()
    }

    /// Description of the frame source, e.g. its URL
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(source = %self.source, "Dropping session");
        buffer::lock(&self.buffer).close();
        self.cancel.cancel();
    }
}

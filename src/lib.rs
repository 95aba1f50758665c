//! Streaming client for remote physics-simulation visualizers.
//!
//! Simview pulls frames from a simulation server over WebSocket, buffers them,
//! and replays them into a scene at a pace proportional to the simulated time
//! between frames.
//!
//! # Features
//!
//! - **Pull protocol**: every frame is acknowledged with `ok`; the server only
//!   computes the next step after that, so the client sets the production rate
//! - **Timestamp pacing**: each frame stays on screen for
//!   `scaling_factor * (next.time - time)` milliseconds
//! - **Clean shutdown**: closing a session sends `close`, hangs up and stops
//!   playback without leaving timers behind
//!
//! ## Example
//!
//! ```rust,no_run
//! use simview::{EndpointConfig, ObjectPool, PlaybackConfig, Scenario, Simview, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> simview::Result<()> {
//!     let endpoint = EndpointConfig::new(Scenario::IdealGas);
//!     let pool = ObjectPool::new(Scenario::IdealGas.particle_count());
//!     let mut session = Simview::connect(&endpoint, PlaybackConfig::default(), pool).await?;
//!
//!     let mut status = session.status_updates(UpdateRate::Max(1));
//!     while let Some(status) = status.next().await {
//!         println!("t = {:?}, presented = {}", status.current_time, status.presented);
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod buffer;
pub mod config;
pub mod ingestor;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod source;
pub mod sources;
pub mod stream;

pub use error::*;
pub use types::*;

pub use buffer::{BufferStats, FrameBuffer, OverflowPolicy, PushOutcome, SharedFrameBuffer};
pub use config::{ClientConfig, EndpointConfig, PlaybackConfig};
pub use ingestor::IngestStats;
pub use protocol::ControlToken;
pub use scheduler::{PlaybackState, PlaybackStatus};
pub use session::Session;
pub use sink::{ObjectPool, SceneSink, SharedSink, VertexBuffer};
pub use source::FrameSource;
pub use sources::{ChannelPeer, ChannelSource, WebSocketSource};

/// Unified entry point for simulation sessions.
///
/// ```rust,no_run
/// use simview::{ClientConfig, ObjectPool, Simview};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = ClientConfig::from_file("simview.yaml")?;
/// let pool = ObjectPool::new(config.endpoint.scenario.particle_count());
/// let mut session = Simview::from_config(&config, pool).await?;
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Simview;

impl Simview {
    /// Connect to a simulation server.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint or playback configuration is invalid
    /// - The server cannot be reached within the connect timeout
    /// - The WebSocket handshake fails
    pub async fn connect<K: SceneSink>(
        endpoint: &EndpointConfig,
        playback: PlaybackConfig,
        sink: K,
    ) -> Result<Session> {
        Session::connect(endpoint, playback, sink).await
    }

    /// Connect using a loaded [`ClientConfig`].
    pub async fn from_config<K: SceneSink>(config: &ClientConfig, sink: K) -> Result<Session> {
        Session::from_config(config, sink).await
    }

    /// Start playback over any [`FrameSource`], e.g. a [`ChannelSource`] in tests.
    pub fn start<S: FrameSource, K: SceneSink>(
        source: S,
        playback: PlaybackConfig,
        sink: K,
    ) -> Result<Session> {
        Session::start(source, playback, sink)
    }
}

/// Install a `tracing` subscriber for binaries.
///
/// Honors `RUST_LOG`, falling back to `simview=info`. Calling it twice is harmless.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simview=info"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_timer(fmt::time::uptime()))
        .with(filter)
        .try_init();
}

//! Client configuration
//!
//! Configuration is plain serde data with defaults for every field, so a YAML
//! file only needs to name what it changes:
//!
//! ```yaml
//! endpoint:
//!   host: 192.168.0.6:8000
//!   scenario: wave_2d_system
//!   simulator_id: 1000
//! playback:
//!   scaling_factor: 2200.0
//!   overflow:
//!     policy: drop_oldest
//!     capacity: 600
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::OverflowPolicy;
use crate::types::Scenario;
use crate::{Result, StreamError};

/// Smallest bounded buffer that can still present frames while the source is live
pub const MIN_BOUNDED_CAPACITY: usize = 2;

/// Playback pacing and buffering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Milliseconds of playback per second of simulated time
    ///
    /// 1000.0 plays in real simulated time; the default of 2000.0 plays at half speed.
    pub scaling_factor: f64,

    /// Retry interval while waiting for frames
    pub idle_interval_ms: u64,

    /// Delay after presenting a frame with no successor to measure against
    pub fallback_delay_ms: u64,

    /// What happens when frames arrive faster than they are presented
    pub overflow: OverflowPolicy,

    /// Acknowledge messages that fail to decode
    ///
    /// Off by default: only decoded frames are acknowledged. Turn it on for
    /// servers that wait for an acknowledgment after every message, so one bad
    /// message cannot stall the stream.
    pub ack_malformed: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            scaling_factor: 2000.0,
            idle_interval_ms: 10,
            fallback_delay_ms: 10,
            overflow: OverflowPolicy::Unbounded,
            ack_malformed: false,
        }
    }
}

impl PlaybackConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    /// Convert a simulated-time delta into a presentation delay
    ///
    /// Deltas that are negative or not finite fall back to the fallback delay.
    /// The result is rounded to the nearest nanosecond.
    pub fn delay_for(&self, time_delta: f64) -> Duration {
        let millis = self.scaling_factor * time_delta;
        if millis.is_finite() && millis >= 0.0 {
            Duration::from_nanos((millis * 1_000_000.0).round() as u64)
        } else {
            self.fallback_delay()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scaling_factor.is_finite() || self.scaling_factor <= 0.0 {
            return Err(StreamError::invalid_config(format!(
                "scaling_factor must be positive and finite, got {}",
                self.scaling_factor
            )));
        }
        if self.idle_interval_ms == 0 {
            return Err(StreamError::invalid_config("idle_interval_ms must be at least 1"));
        }
        match self.overflow {
            OverflowPolicy::DropOldest { capacity } | OverflowPolicy::DropNewest { capacity }
                if capacity < MIN_BOUNDED_CAPACITY =>
            {
                Err(StreamError::invalid_config(format!(
                    "overflow capacity must be at least {}: presenting a frame needs the frame \
                     and its successor in the buffer, got {}",
                    MIN_BOUNDED_CAPACITY, capacity
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Where to find the simulation server and which scenario to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// `hostname:port` of the simulation server
    pub host: String,

    /// Use `wss://` instead of `ws://`
    pub secure: bool,

    pub scenario: Scenario,

    /// Attach to a specific server-side simulator instance
    pub simulator_id: Option<u64>,

    /// Lower bound on the server's integration step, in seconds
    pub min_dt: Option<f64>,

    /// Upper bound on the server's integration step, in seconds
    pub max_dt: Option<f64>,

    pub connect_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            secure: false,
            scenario: Scenario::IdealGas,
            simulator_id: None,
            min_dt: None,
            max_dt: None,
            connect_timeout_ms: 5000,
        }
    }
}

impl EndpointConfig {
    /// Endpoint for a scenario on the default host
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario, ..Self::default() }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_simulator_id(mut self, simulator_id: u64) -> Self {
        self.simulator_id = Some(simulator_id);
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Full websocket URL, e.g. `ws://localhost:8000/simulate/sph_system?simulator_id=7`
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let mut url = format!("{}://{}/simulate/{}", scheme, self.host, self.scenario);

        let mut query = Vec::new();
        if let Some(id) = self.simulator_id {
            query.push(format!("simulator_id={}", id));
        }
        if let Some(min_dt) = self.min_dt {
            query.push(format!("min_dt={}", min_dt));
        }
        if let Some(max_dt) = self.max_dt {
            query.push(format!("max_dt={}", max_dt));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(StreamError::invalid_endpoint(self.url(), "host is empty"));
        }
        if self.host.contains("://") || self.host.contains('/') {
            return Err(StreamError::invalid_endpoint(
                self.url(),
                "host must be 'hostname:port' without scheme or path",
            ));
        }
        for (name, value) in [("min_dt", self.min_dt), ("max_dt", self.max_dt)] {
            if let Some(dt) = value {
                if !dt.is_finite() || dt <= 0.0 {
                    return Err(StreamError::invalid_endpoint(
                        self.url(),
                        format!("{} must be positive, got {}", name, dt),
                    ));
                }
            }
        }
        if let (Some(min_dt), Some(max_dt)) = (self.min_dt, self.max_dt) {
            if min_dt > max_dt {
                return Err(StreamError::invalid_endpoint(
                    self.url(),
                    format!("min_dt {} exceeds max_dt {}", min_dt, max_dt),
                ));
            }
        }
        Ok(())
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: EndpointConfig,
    pub playback: PlaybackConfig,
}

impl ClientConfig {
    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| StreamError::invalid_config(format!("YAML parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), bytes = yaml.len(), "Loaded config file");
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        self.playback.validate()
    }
}

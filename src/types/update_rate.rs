//! Update rate control for status streams

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often a status stream yields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Yield every change as it is published
    Immediate,

    /// Yield at most this many times per second, latest value wins
    Max(u32),
}

impl UpdateRate {
    /// Sampling interval, or `None` when every change should be yielded
    ///
    /// `Max(0)` is treated as `Immediate`.
    pub fn sample_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Immediate | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

//! Test utilities for building frames and observing presentation
//!
//! Shared by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use tokio::time::Instant;

use crate::sink::SceneSink;
use crate::types::{Frame, Position};

/// Frame at `time` with `particles` positions spread along the x axis
pub fn frame_at(time: f64, particles: usize) -> Frame {
    Frame::new(time, (0..particles).map(|i| [i as f64, time, 0.0]).collect())
}

/// JSON message shaped like the server's output for `particles` particles
pub fn server_message(time: f64, particles: usize) -> String {
    let positions: Vec<String> = (0..particles)
        .map(|i| {
            let x = (i as f64 * 0.37).sin() * 10.0;
            let y = (i as f64 * 0.11).cos() * 10.0;
            format!("[{:.6}, {:.6}, {:.6}]", x, y, time)
        })
        .collect();
    format!(
        r#"{{"time": {}, "positions": [{}], "simulator_id": 140230}}"#,
        time,
        positions.join(", ")
    )
}

/// One frame as the sink received it
#[derive(Debug, Clone)]
pub struct PresentedFrame {
    pub at: Instant,
    pub time: f64,
    pub positions: Vec<Position>,
}

/// Sink that records every presented frame with the instant it arrived
#[derive(Debug)]
pub struct RecordingSink {
    objects: usize,
    pending: Vec<Position>,
    presented: Vec<PresentedFrame>,
}

impl RecordingSink {
    pub fn new(objects: usize) -> Self {
        Self { objects, pending: vec![[0.0; 3]; objects], presented: Vec::new() }
    }

    pub fn presented(&self) -> &[PresentedFrame] {
        &self.presented
    }
}

impl SceneSink for RecordingSink {
    fn object_count(&self) -> usize {
        self.objects
    }

    fn set_position(&mut self, index: usize, position: Position) {
        self.pending[index] = position;
    }

    fn commit(&mut self, time: f64) {
        self.presented.push(PresentedFrame {
            at: Instant::now(),
            time,
            positions: self.pending.clone(),
        });
    }
}

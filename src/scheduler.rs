//! Playback scheduler: presents buffered frames at the simulated pace
//!
//! Each tick presents the head frame to the scene sink, derives the next
//! tick's delay from the gap to the following frame, and removes the head.
//! With fewer than two frames there is nothing to measure the gap against,
//! so the scheduler polls until more frames arrive. Once the source has ended
//! it drains what is left, using the fallback delay for the last frame.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::{self, SharedFrameBuffer};
use crate::config::PlaybackConfig;
use crate::sink::SceneSink;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackState {
    /// Waiting for enough frames to present
    #[default]
    IdlePoll,
    /// Presenting frames
    Presenting,
    /// Cancelled; no further ticks will run
    Stopped,
}

/// Snapshot of playback progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Simulated time of the last presented frame
    pub current_time: Option<f64>,
    pub presented: u64,
    pub dropped: u64,
    /// Frames waiting in the buffer after the last tick
    pub buffered: usize,
}

/// Result of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Nothing presented; check again after `retry_after`
    Idle { retry_after: Duration },
    /// Head frame presented and removed
    Presented { time: f64, next_after: Duration },
    /// Head frame did not fit the scene and was removed unapplied
    Dropped { time: f64, next_after: Duration },
}

impl Tick {
    /// How long to wait before the next tick
    pub fn wait(&self) -> Duration {
        match *self {
            Tick::Idle { retry_after } => retry_after,
            Tick::Presented { next_after, .. } | Tick::Dropped { next_after, .. } => next_after,
        }
    }
}

/// Consumer half of a session
pub struct PlaybackScheduler<K: SceneSink> {
    buffer: SharedFrameBuffer,
    sink: K,
    config: PlaybackConfig,
    status: watch::Sender<PlaybackStatus>,
    cancel: CancellationToken,
}

impl<K: SceneSink> PlaybackScheduler<K> {
    pub fn new(
        buffer: SharedFrameBuffer,
        sink: K,
        config: PlaybackConfig,
        status: watch::Sender<PlaybackStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self { buffer, sink, config, status, cancel }
    }

    /// Run one tick
    ///
    /// Presents and removes at most one frame. The head is removed under the
    /// buffer lock and presented after the lock is released, so the presented
    /// frame is always the one removed and the sink never runs under the lock.
    pub fn tick(&mut self) -> Tick {
        let mut buffer = buffer::lock(&self.buffer);
        let delay = match buffer.peek_pair() {
            Some((head, Some(next))) => Some(self.config.delay_for(next.time - head.time)),
            Some((_, None)) if buffer.source_ended() => Some(self.config.fallback_delay()),
            _ => None,
        };
        let head = match delay {
            Some(delay) => buffer.pop_front().map(|frame| (frame, delay)),
            None => None,
        };
        let buffered = buffer.len();
        drop(buffer);

        let Some((frame, delay)) = head else {
            return self.idle(buffered);
        };
        let time = frame.time;

        match self.sink.present(&frame) {
            Ok(()) => {
                trace!(time, delay_ms = delay.as_secs_f64() * 1000.0, buffered, "Frame presented");
                self.status.send_modify(|status| {
                    status.state = PlaybackState::Presenting;
                    status.current_time = Some(time);
                    status.presented += 1;
                    status.buffered = buffered;
                });
                Tick::Presented { time, next_after: delay }
            }
            Err(e) => {
                warn!(time, error = %e, "Dropping frame");
                self.status.send_modify(|status| {
                    status.state = PlaybackState::Presenting;
                    status.dropped += 1;
                    status.buffered = buffered;
                });
                Tick::Dropped { time, next_after: delay }
            }
        }
    }

    fn idle(&mut self, buffered: usize) -> Tick {
        self.status.send_if_modified(|status| {
            let changed = status.state != PlaybackState::IdlePoll || status.buffered != buffered;
            status.state = PlaybackState::IdlePoll;
            status.buffered = buffered;
            changed
        });
        Tick::Idle { retry_after: self.config.idle_interval() }
    }

    /// Tick until cancelled
    ///
    /// The first tick runs immediately. Cancellation is checked before every
    /// tick and interrupts the wait between ticks.
    pub async fn run(mut self) -> PlaybackStatus {
        info!(
            scaling_factor = self.config.scaling_factor,
            objects = self.sink.object_count(),
            "Playback scheduler started"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let wait = self.tick().wait();

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        self.status.send_modify(|status| status.state = PlaybackState::Stopped);
        let status = *self.status.borrow();
        debug!(
            presented = status.presented,
            dropped = status.dropped,
            "Playback scheduler stopped"
        );
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FrameBuffer, OverflowPolicy};
    use crate::test_utils::{RecordingSink, frame_at};
    use crate::types::Frame;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    type SharedRecorder = Arc<Mutex<RecordingSink>>;

    fn scheduler(
        objects: usize,
        frames: Vec<Frame>,
    ) -> (PlaybackScheduler<SharedRecorder>, SharedRecorder, SharedFrameBuffer) {
        let buffer = FrameBuffer::shared(OverflowPolicy::Unbounded);
        for frame in frames {
            buffer::lock(&buffer).push(frame);
        }
        let sink = Arc::new(Mutex::new(RecordingSink::new(objects)));
        let (status, _) = watch::channel(PlaybackStatus::default());
        let scheduler = PlaybackScheduler::new(
            buffer.clone(),
            sink.clone(),
            PlaybackConfig::default(),
            status,
            CancellationToken::new(),
        );
        (scheduler, sink, buffer)
    }

    #[test]
    fn delays_follow_timestamp_gaps() {
        let frames = vec![frame_at(0.0, 1), frame_at(0.1, 1), frame_at(0.3, 1), frame_at(0.4, 1)];
        let (mut scheduler, _, _) = scheduler(1, frames);

        assert_eq!(
            scheduler.tick(),
            Tick::Presented { time: 0.0, next_after: Duration::from_millis(200) }
        );
        assert_eq!(
            scheduler.tick(),
            Tick::Presented { time: 0.1, next_after: Duration::from_millis(400) }
        );
    }

    #[test]
    fn lone_frame_waits_while_source_is_live() {
        let (mut scheduler, sink, buffer) = scheduler(1, vec![frame_at(0.0, 1)]);

        assert_eq!(scheduler.tick(), Tick::Idle { retry_after: Duration::from_millis(10) });
        assert_eq!(buffer::lock(&buffer).len(), 1);
        assert!(sink.lock().unwrap().presented().is_empty());
    }

    #[test]
    fn empty_buffer_idles() {
        let (mut scheduler, _, buffer) = scheduler(1, vec![]);
        assert!(matches!(scheduler.tick(), Tick::Idle { .. }));
        assert!(buffer::lock(&buffer).is_empty());
    }

    #[test]
    fn lone_frame_drains_with_fallback_after_source_ends() {
        let (mut scheduler, sink, buffer) = scheduler(1, vec![frame_at(0.0, 1)]);
        buffer::lock(&buffer).mark_source_ended();

        assert_eq!(
            scheduler.tick(),
            Tick::Presented { time: 0.0, next_after: Duration::from_millis(10) }
        );
        assert!(buffer::lock(&buffer).is_empty());
        assert_eq!(sink.lock().unwrap().presented().len(), 1);
    }

    #[test]
    fn mismatched_frame_is_dropped_and_next_is_presented() {
        let frames = vec![
            Frame::new(0.0, vec![[1.0, 1.0, 1.0]; 3]),
            Frame::new(0.1, vec![[2.0, 2.0, 2.0]; 2]),
            Frame::new(0.2, vec![[3.0, 3.0, 3.0]; 2]),
        ];
        let (mut scheduler, sink, buffer) = scheduler(2, frames);

        assert!(matches!(scheduler.tick(), Tick::Dropped { time, .. } if time == 0.0));
        assert_eq!(buffer::lock(&buffer).len(), 2);
        assert!(matches!(scheduler.tick(), Tick::Presented { time, .. } if time == 0.1));

        let sink = sink.lock().unwrap();
        assert_eq!(sink.presented().len(), 1);
        assert_eq!(sink.presented()[0].positions, vec![[2.0, 2.0, 2.0]; 2]);

        let status = *scheduler.status.borrow();
        assert_eq!(status.dropped, 1);
        assert_eq!(status.presented, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_frame_scenario_presents_on_schedule() {
        let frames = vec![
            Frame::new(0.0, vec![[0.0, 0.0, 0.0]]),
            Frame::new(0.1, vec![[1.0, 0.0, 0.0]]),
        ];
        let (scheduler, sink, buffer) = scheduler(1, frames);
        buffer::lock(&buffer).mark_source_ended();
        let cancel = scheduler.cancel.clone();

        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let status = handle.await.unwrap();

        let sink = sink.lock().unwrap();
        let presented = sink.presented();
        assert_eq!(presented.len(), 2);
        assert_eq!(presented[0].positions, vec![[0.0, 0.0, 0.0]]);
        assert_eq!(presented[0].at - start, Duration::ZERO);
        assert_eq!(presented[1].positions, vec![[1.0, 0.0, 0.0]]);
        assert_eq!(presented[1].at - start, Duration::from_millis(200));

        assert!(buffer::lock(&buffer).is_empty());
        assert_eq!(status.state, PlaybackState::Stopped);
        assert_eq!(status.presented, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_idle_polling() {
        let (scheduler, sink, buffer) = scheduler(1, vec![]);
        let cancel = scheduler.cancel.clone();
        let handle = tokio::spawn(scheduler.run());

        tokio::time::sleep(Duration::from_millis(55)).await;
        cancel.cancel();
        let status = handle.await.unwrap();
        assert_eq!(status.state, PlaybackState::Stopped);

        // Frames pushed after cancellation are never presented.
        buffer::lock(&buffer).push(frame_at(0.0, 1));
        buffer::lock(&buffer).push(frame_at(0.1, 1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sink.lock().unwrap().presented().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[allow(clippy::await_holding_lock)]
    async fn renderer_holding_sink_does_not_block_buffer() {
        let frames = (0..4).map(|i| frame_at(i as f64 * 0.1, 1)).collect();
        let (scheduler, sink, buffer) = scheduler(1, frames);
        let cancel = scheduler.cancel.clone();

        let renderer = sink.lock().unwrap();
        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The scheduler has taken the head and now waits on the sink.
        let (tx, rx) = std::sync::mpsc::channel();
        let observer = buffer.clone();
        std::thread::spawn(move || {
            let _ = tx.send(buffer::lock(&observer).len());
        });
        let buffered = rx.recv_timeout(Duration::from_secs(2));

        drop(renderer);
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(buffered, Ok(3));
        assert_eq!(sink.lock().unwrap().presented().len(), 1);
    }

    proptest! {
        #[test]
        fn frames_are_presented_in_enqueue_order(
            gaps in prop::collection::vec(prop_oneof![Just(0.0f64), 0.0f64..0.5], 1..40),
        ) {
            // Each frame carries its enqueue index, so equal timestamps still
            // tell frames apart.
            let mut time = 0.0;
            let mut frames = Vec::new();
            for (index, gap) in gaps.iter().enumerate() {
                frames.push(Frame::new(time, vec![[index as f64, time, 0.0]; 2]));
                time += gap;
            }
            let enqueued = frames.clone();
            let count = frames.len();
            let (mut scheduler, sink, buffer) = scheduler(2, frames);
            buffer::lock(&buffer).mark_source_ended();

            for remaining in (0..count).rev() {
                prop_assert!(matches!(scheduler.tick(), Tick::Presented { .. }), "expected Tick::Presented");
                prop_assert_eq!(buffer::lock(&buffer).len(), remaining);
            }
            prop_assert!(matches!(scheduler.tick(), Tick::Idle { .. }), "expected Tick::Idle");

            let sink = sink.lock().unwrap();
            let presented = sink.presented();
            prop_assert_eq!(presented.len(), count);
            for (shown, frame) in presented.iter().zip(&enqueued) {
                prop_assert_eq!(shown.time, frame.time);
                prop_assert_eq!(&shown.positions, &frame.positions);
            }
        }
    }
}

//! Frame buffer shared by the ingestor and the playback scheduler
//!
//! The ingestor appends at the tail, the scheduler presents and removes at the
//! head. Each session owns exactly one buffer behind a mutex; the lock is held
//! for one buffer operation at a time and never across an await point.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::types::Frame;

/// Buffer shared between the two halves of a session
pub type SharedFrameBuffer = Arc<Mutex<FrameBuffer>>;

/// What to do when frames arrive faster than they are presented
///
/// `Unbounded` keeps every frame; memory grows for as long as delivery
/// outpaces playback. The bounded policies cap the queue length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OverflowPolicy {
    #[default]
    Unbounded,

    /// Evict the head to make room for the incoming frame
    DropOldest { capacity: usize },

    /// Refuse the incoming frame
    DropNewest { capacity: usize },
}

/// Result of appending a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest frame
    QueuedWithEviction,
    /// Refused because the buffer is full
    Rejected,
    /// Refused because the session is closing
    Closed,
}

/// Counters describing buffer traffic over a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub enqueued: u64,
    pub evicted: u64,
    pub rejected: u64,
    /// Largest queue length observed
    pub high_water: usize,
}

/// FIFO queue of frames awaiting presentation
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    policy: OverflowPolicy,
    closed: bool,
    source_ended: bool,
    stats: BufferStats,
}

impl FrameBuffer {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// Create a buffer ready to be shared between ingestor and scheduler
    pub fn shared(policy: OverflowPolicy) -> SharedFrameBuffer {
        Arc::new(Mutex::new(Self::new(policy)))
    }

    /// Append a frame at the tail
    pub fn push(&mut self, frame: Frame) -> PushOutcome {
        if self.closed {
            return PushOutcome::Closed;
        }

        let outcome = match self.policy {
            OverflowPolicy::Unbounded => PushOutcome::Queued,
            OverflowPolicy::DropOldest { capacity } if self.frames.len() >= capacity => {
                while self.frames.len() >= capacity.max(1) {
                    self.frames.pop_front();
                    self.stats.evicted += 1;
                }
                PushOutcome::QueuedWithEviction
            }
            OverflowPolicy::DropNewest { capacity } if self.frames.len() >= capacity => {
                self.stats.rejected += 1;
                return PushOutcome::Rejected;
            }
            _ => PushOutcome::Queued,
        };

        self.frames.push_back(frame);
        self.stats.enqueued += 1;
        self.stats.high_water = self.stats.high_water.max(self.frames.len());
        outcome
    }

    /// Head frame and its successor, without removing either
    pub fn peek_pair(&self) -> Option<(&Frame, Option<&Frame>)> {
        let head = self.frames.front()?;
        Some((head, self.frames.get(1)))
    }

    /// Remove the head frame
    pub fn pop_front(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop every frame and refuse further appends
    ///
    /// Closing is idempotent.
    pub fn close(&mut self) {
        self.closed = true;
        self.frames.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Record that no more frames will arrive
    ///
    /// Frames already queued are kept so playback can drain them.
    pub fn mark_source_ended(&mut self) {
        self.source_ended = true;
    }

    pub fn source_ended(&self) -> bool {
        self.source_ended
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }
}

/// Lock a shared buffer, recovering the data if a holder panicked
///
/// Every critical section leaves the queue in a consistent state, so a
/// poisoned lock still guards valid data.
pub(crate) fn lock(buffer: &SharedFrameBuffer) -> MutexGuard<'_, FrameBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! Scene sinks receive presented frames
//!
//! The renderer owns the scene; playback only needs to move objects. A sink
//! exposes a fixed pool of objects and accepts one position per object.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{Frame, Position};
use crate::{Result, StreamError};

/// Target that receives per-object position updates
pub trait SceneSink: Send + 'static {
    /// Number of live objects in the scene
    fn object_count(&self) -> usize;

    /// Move object `index` to `position`
    fn set_position(&mut self, index: usize, position: Position);

    /// Called after all positions of a frame have been written
    fn commit(&mut self, _time: f64) {}

    /// Write a whole frame into the scene
    ///
    /// A frame whose particle count differs from the object count is refused
    /// with [`StreamError::DataInconsistency`] before anything is written.
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let expected = self.object_count();
        if frame.particle_count() != expected {
            return Err(StreamError::data_inconsistency(expected, frame.particle_count()));
        }
        for (index, position) in frame.positions.iter().enumerate() {
            self.set_position(index, *position);
        }
        self.commit(frame.time);
        Ok(())
    }
}

/// A sink shared between playback and the renderer
pub type SharedSink<S> = Arc<Mutex<S>>;

impl<S: SceneSink> SceneSink for Arc<Mutex<S>> {
    fn object_count(&self) -> usize {
        lock_sink(self).object_count()
    }

    fn set_position(&mut self, index: usize, position: Position) {
        lock_sink(self).set_position(index, position);
    }

    fn commit(&mut self, time: f64) {
        lock_sink(self).commit(time);
    }

    // One lock for the whole frame instead of one per object.
    fn present(&mut self, frame: &Frame) -> Result<()> {
        lock_sink(self).present(frame)
    }
}

fn lock_sink<S>(sink: &Mutex<S>) -> MutexGuard<'_, S> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One position per scene object, e.g. a pool of spheres
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPool {
    positions: Vec<Position>,
    last_time: Option<f64>,
    frames_applied: u64,
}

impl ObjectPool {
    /// Pool of `count` objects at the origin
    pub fn new(count: usize) -> Self {
        Self { positions: vec![[0.0; 3]; count], last_time: None, frames_applied: 0 }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<Position> {
        self.positions.get(index).copied()
    }

    /// Simulated time of the last presented frame
    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }
}

impl SceneSink for ObjectPool {
    fn object_count(&self) -> usize {
        self.positions.len()
    }

    fn set_position(&mut self, index: usize, position: Position) {
        if let Some(slot) = self.positions.get_mut(index) {
            *slot = position;
        }
    }

    fn commit(&mut self, time: f64) {
        self.last_time = Some(time);
        self.frames_applied += 1;
    }
}

/// Flat `x, y, z` vertex array for a deformable mesh such as a wave grid
///
/// Each presented frame marks the buffer dirty; the renderer re-uploads the
/// vertices (and recomputes normals) and then calls [`VertexBuffer::take_dirty`].
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    vertices: Vec<f32>,
    dirty: bool,
}

impl VertexBuffer {
    pub fn new(vertex_count: usize) -> Self {
        Self { vertices: vec![0.0; vertex_count * 3], dirty: false }
    }

    /// Interleaved vertex data, three floats per vertex
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl SceneSink for VertexBuffer {
    fn object_count(&self) -> usize {
        self.vertices.len() / 3
    }

    fn set_position(&mut self, index: usize, position: Position) {
        if let Some(vertex) = self.vertices.get_mut(index * 3..index * 3 + 3) {
            vertex[0] = position[0] as f32;
            vertex[1] = position[1] as f32;
            vertex[2] = position[2] as f32;
        }
    }

    fn commit(&mut self, _time: f64) {
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_pool_applies_frame() {
        let mut pool = ObjectPool::new(2);
        pool.present(&Frame::new(0.5, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();

        assert_eq!(pool.position(0), Some([1.0, 2.0, 3.0]));
        assert_eq!(pool.position(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(pool.last_time(), Some(0.5));
        assert_eq!(pool.frames_applied(), 1);
    }

    #[test]
    fn mismatched_frame_leaves_scene_untouched() {
        let mut pool = ObjectPool::new(2);
        let err = pool.present(&Frame::new(0.0, vec![[9.0; 3]; 3])).unwrap_err();

        assert!(matches!(err, StreamError::DataInconsistency { expected: 2, actual: 3 }));
        assert_eq!(pool.positions(), &[[0.0; 3], [0.0; 3]]);
        assert_eq!(pool.frames_applied(), 0);
    }

    #[test]
    fn vertex_buffer_interleaves_and_flags_dirty() {
        let mut mesh = VertexBuffer::new(2);
        mesh.present(&Frame::new(0.0, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();

        assert_eq!(mesh.vertices(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(mesh.take_dirty());
        assert!(!mesh.is_dirty());
    }

    #[test]
    fn shared_sink_is_visible_to_renderer() {
        let pool = Arc::new(Mutex::new(ObjectPool::new(1)));
        let mut playback_side = Arc::clone(&pool);

        playback_side.present(&Frame::new(0.1, vec![[7.0, 8.0, 9.0]])).unwrap();
        assert_eq!(pool.lock().unwrap().position(0), Some([7.0, 8.0, 9.0]));
        assert_eq!(playback_side.object_count(), 1);
    }
}

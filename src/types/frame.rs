//! Frame type for the streaming playback pipeline

/// One particle or vertex position as `[x, y, z]`.
pub type Position = [f64; 3];

/// One timestamped set of positions produced by the simulator
///
/// This is the unit that flows from the ingestor through the frame buffer to
/// the scene sink. A frame is consumed the moment it is presented.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Simulated time in seconds
    pub time: f64,

    /// One position per scene object, in object order
    pub positions: Vec<Position>,

    /// Identifier of the server-side simulator instance, when the server reports it
    pub simulator_id: Option<u64>,
}

impl Frame {
    /// Create a new frame
    pub fn new(time: f64, positions: Vec<Position>) -> Self {
        Self { time, positions, simulator_id: None }
    }

    /// Attach the server-side simulator identifier
    pub fn with_simulator_id(mut self, simulator_id: u64) -> Self {
        self.simulator_id = Some(simulator_id);
        self
    }

    /// Number of particles (or grid vertices) carried by this frame
    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }
}

//! Core types for the frame streaming pipeline.
//!
//! - [`Frame`] is one timestamped set of positions from the simulator
//! - [`Scenario`] names the server-side simulation and its particle count
//! - [`ConnectionState`] tracks whether a session still has a live socket
//! - [`UpdateRate`] controls how often status streams yield
//!
//! ```rust
//! use simview::types::{Frame, Scenario};
//!
//! let frame = Frame::new(0.25, vec![[0.0, 1.0, 2.0]; Scenario::IdealGas.particle_count()]);
//! assert_eq!(frame.particle_count(), 100);
//! ```

mod connection_state;
mod frame;
mod scenario;
mod update_rate;

pub use connection_state::ConnectionState;
pub use frame::{Frame, Position};
pub use scenario::Scenario;
pub use update_rate::UpdateRate;

//! Simulation scenarios served by the backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

/// Simulation scenarios available under `/simulate/<scenario>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Hard spheres bouncing in a box
    #[serde(rename = "ideal_gas_system")]
    IdealGas,

    /// Smoothed-particle hydrodynamics fluid
    #[serde(rename = "sph_system")]
    Sph,

    /// Height field of a 2D wave equation, streamed as grid vertices
    #[serde(rename = "wave_2d_system")]
    Wave2d,
}

impl Scenario {
    /// All supported scenarios
    pub const ALL: [Scenario; 3] = [Scenario::IdealGas, Scenario::Sph, Scenario::Wave2d];

    /// Path segment used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::IdealGas => "ideal_gas_system",
            Scenario::Sph => "sph_system",
            Scenario::Wave2d => "wave_2d_system",
        }
    }

    /// Number of positions per frame the server produces for this scenario
    ///
    /// Ideal gas runs 100 particles, SPH 500, and the wave grid is 50 x 50.
    pub fn particle_count(self) -> usize {
        match self {
            Scenario::IdealGas => 100,
            Scenario::Sph => 500,
            Scenario::Wave2d => 50 * 50,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        Scenario::ALL.into_iter().find(|scenario| scenario.as_str() == s).ok_or_else(|| {
            StreamError::invalid_config(format!(
                "unknown scenario '{}' (expected one of \
                 ideal_gas_system, sph_system, wave_2d_system)",
                s
            ))
        })
    }
}

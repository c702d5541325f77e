//! Stage coordinates and axis names.

use crate::error::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stage position `(x, y, z)` in native stage units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Lateral X
    pub x: f64,
    /// Lateral Y
    pub y: f64,
    /// Focus drive
    pub z: f64,
}

impl Coordinate {
    /// Build a coordinate.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2}, {:.2}]", self.x, self.y, self.z)
    }
}

/// Addressable stage axes.
///
/// X and Y always move together on the lateral stage, so they form one axis
/// from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Lateral XY stage
    Xy,
    /// Focus drive
    Z,
}

impl FromStr for Axis {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xy" => Ok(Axis::Xy),
            "z" => Ok(Axis::Z),
            _ => Err(ScopeError::InvalidAxis(s.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Xy => write!(f, "xy"),
            Axis::Z => write!(f, "z"),
        }
    }
}

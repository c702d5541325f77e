//! Stage travel windows and shared runtime constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Timing Constants
// =============================================================================

/// Default sleep between scheduler ticks when nothing fired (1 ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Centered acquisition ROI applied when `roi_center` is enabled: `(x, y, width, height)`.
pub const CENTER_ROI: (u32, u32, u32, u32) = (300, 300, 600, 600);

// =============================================================================
// Travel Windows
// =============================================================================

/// Default X travel relative to the origin, in stage units.
pub const DEFAULT_X_LIMIT: [f64; 2] = [-9600.0, 9600.0];
/// Default Y travel relative to the origin, in stage units.
pub const DEFAULT_Y_LIMIT: [f64; 2] = [-9600.0, 9600.0];
/// Default Z travel relative to the origin, in stage units.
pub const DEFAULT_Z_LIMIT: [f64; 2] = [-240.0, 240.0];

/// Absolute open interval a stage axis may be commanded into.
///
/// Both ends are exclusive: a target sitting exactly on a bound is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelWindow {
    /// Lower bound (exclusive)
    pub min: f64,
    /// Upper bound (exclusive)
    pub max: f64,
}

impl TravelWindow {
    /// Window of `origin + [lower, upper]`.
    pub fn around(origin: f64, offsets: [f64; 2]) -> Self {
        Self {
            min: origin + offsets[0],
            max: origin + offsets[1],
        }
    }

    /// Whether `target` lies strictly inside the window.
    pub fn contains(&self, target: f64) -> bool {
        target > self.min && target < self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_relative_to_origin() {
        let window = TravelWindow::around(100.0, [-240.0, 240.0]);
        assert_eq!(window.min, -140.0);
        assert_eq!(window.max, 340.0);
    }

    #[test]
    fn bounds_are_exclusive() {
        let window = TravelWindow::around(0.0, [-10.0, 10.0]);
        assert!(window.contains(0.0));
        assert!(window.contains(9.999));
        assert!(!window.contains(10.0));
        assert!(!window.contains(-10.0));
        assert!(!window.contains(25.0));
    }
}

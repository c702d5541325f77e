//! Timing configuration for realistic mode.

use std::time::Duration;

/// Timing configuration for realistic mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Frame readout time in milliseconds, added on top of the exposure
    pub frame_readout_ms: u64,
    /// Stage settling time in milliseconds after a move
    pub settling_time_ms: u64,
    /// Round-trip delay in milliseconds for every other command
    pub communication_delay_ms: u64,
}

impl TimingConfig {
    /// Timing of a motorized inverted microscope with an sCMOS camera.
    pub fn microscope() -> Self {
        Self {
            frame_readout_ms: 33,
            settling_time_ms: 50,
            communication_delay_ms: 2,
        }
    }

    /// Settling delay as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settling_time_ms)
    }

    /// Command round-trip as a [`Duration`].
    pub fn command(&self) -> Duration {
        Duration::from_millis(self.communication_delay_ms)
    }

    /// Duration of one snap at the given exposure (milliseconds).
    pub fn snap(&self, exposure_ms: f64) -> Duration {
        Duration::from_millis(self.frame_readout_ms)
            + Duration::from_secs_f64(exposure_ms.max(0.0) / 1000.0)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_readout_ms: 0,
            settling_time_ms: 0,
            communication_delay_ms: 0,
        }
    }
}

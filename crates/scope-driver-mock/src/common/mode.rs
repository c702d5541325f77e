//! Operational modes for mock devices.
//!
//! - **Instant**: Zero delays, deterministic behavior for unit tests
//! - **Realistic**: Hardware-like timing for integration tests
//! - **Chaos**: Realistic timing with every delay jittered by up to 50%,
//!   meant to be paired with a [`FaultPlan`]
//!
//! [`FaultPlan`]: super::FaultPlan

/// Operational modes for mock devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockMode {
    /// Zero delays, deterministic - for unit tests
    #[default]
    Instant,
    /// Hardware-like timing - for integration tests
    Realistic,
    /// Jittered hardware-like timing - for resilience testing
    Chaos,
}

impl MockMode {
    /// Whether this mode simulates device latency.
    pub fn is_timed(self) -> bool {
        !matches!(self, MockMode::Instant)
    }

    /// Relative spread applied to each simulated delay.
    pub fn jitter_fraction(self) -> f64 {
        match self {
            MockMode::Chaos => 0.5,
            MockMode::Instant | MockMode::Realistic => 0.0,
        }
    }
}

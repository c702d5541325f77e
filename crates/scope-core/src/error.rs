//! Custom error types for the scope workspace.
//!
//! `ScopeError` is the primary error type. It follows the failure taxonomy of
//! the experiment runtime:
//!
//! - **Configuration errors** (`InvalidAxis`, `Configuration`, `Config`): fatal,
//!   raised immediately and never recovered by the scheduler.
//! - **Hardware faults** (`Driver`): propagated out of the scheduler tick and
//!   abort the run. There is no retry or backoff.
//! - **Storage failures** (`Io`, `Storage`): also abort the run.
//!
//! Travel-limit violations have no variant: a move outside the configured
//! window is dropped by the position registry and logged.

use thiserror::Error;

// =============================================================================
// Driver Errors
// =============================================================================

/// Broad classification of a hardware driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Device could not be brought up.
    Initialization,
    /// Link to the device controller was lost.
    Communication,
    /// The device reported a fault.
    Hardware,
    /// The device did not answer in time.
    Timeout,
    /// A value was rejected by the device.
    InvalidParameter,
    /// Anything else.
    Unknown,
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DriverErrorKind::Initialization => "initialization",
            DriverErrorKind::Communication => "communication",
            DriverErrorKind::Hardware => "hardware",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::InvalidParameter => "invalid_parameter",
            DriverErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// A failure reported by a hardware driver.
#[derive(Error, Debug, Clone)]
#[error("Driver '{driver_type}' {kind} error: {message}")]
pub struct DriverError {
    /// Driver identifier, e.g. `mock_microscope`.
    pub driver_type: String,
    /// Failure class.
    pub kind: DriverErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl DriverError {
    /// Build a driver error.
    pub fn new(
        driver_type: impl Into<String>,
        kind: DriverErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            driver_type: driver_type.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias for results using the workspace error type.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Primary error type for experiment automation.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// An axis name other than `xy` or `z` was passed to a position call.
    #[error("Invalid axis '{0}': expected 'xy' or 'z'")]
    InvalidAxis(String),

    /// Configuration values parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Configuration file or environment could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Standard I/O failure while persisting session outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image or pulse log could not be written.
    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    /// Hardware call failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A site id beyond the end of the position registry was addressed.
    #[error("Site {site} out of range: registry holds {len} site(s)")]
    SiteOutOfRange {
        /// Requested site id.
        site: usize,
        /// Registry length at the time of the request.
        len: usize,
    },
}

impl From<figment::Error> for ScopeError {
    fn from(err: figment::Error) -> Self {
        ScopeError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display_includes_kind_and_driver() {
        let err = DriverError::new("mock_microscope", DriverErrorKind::Timeout, "snap stalled");
        assert_eq!(
            err.to_string(),
            "Driver 'mock_microscope' timeout error: snap stalled"
        );
    }

    #[test]
    fn driver_error_converts_transparently() {
        let err: ScopeError =
            DriverError::new("stage", DriverErrorKind::Hardware, "fault 66").into();
        assert!(matches!(err, ScopeError::Driver(_)));
        assert!(err.to_string().contains("fault 66"));
    }

    #[test]
    fn invalid_axis_message_names_axis() {
        let err = ScopeError::InvalidAxis("w".into());
        assert!(err.to_string().contains("'w'"));
    }
}

//! Mock Hardware for scope
//!
//! A simulated microscope for running experiments without physical hardware.
//! All delays use async-safe operations (tokio::time::sleep, not std::thread::sleep),
//! so tests running on paused tokio time complete instantly.
//!
//! # Available Mock Drivers
//!
//! - [`MockMicroscope`] - XY stage, focus drive, channel presets, shutter, camera, ROI
//!
//! # Performance Characteristics (Realistic mode)
//!
//! - Stage moves: 50ms settling time
//! - Snap: exposure + 33ms readout
//! - Other commands: 2ms round trip

pub mod common;
mod mock_microscope;
mod pattern;

// Re-export common types
pub use common::{Fault, FaultPlan, MockMode, MockRng, Operation, TimingConfig};

pub use mock_microscope::{HardwareCall, MockMicroscope, MockMicroscopeBuilder};

pub use pattern::{generate_focus_pattern, sharpness};

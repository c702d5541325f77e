//! Persistence for experiment sessions.
//!
//! - [`layout`]: directory scheme of a session and experiment naming
//! - [`tiff_writer`]: grayscale TIFF export of camera frames
//! - [`pulse_log`]: per-site induction pulse timings as CSV
//! - [`recorder`]: side-effecting collaborator invoked by running tasks

pub mod layout;
pub mod pulse_log;
pub mod recorder;
pub mod tiff_writer;

pub use layout::{experiment_dir, sanitize_name, SessionLayout};
pub use pulse_log::PulseLog;
pub use recorder::SessionRecorder;
pub use tiff_writer::TiffWriter;

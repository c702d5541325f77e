//! `scope-core`
//!
//! Shared building blocks for time-lapse microscopy automation: the hardware
//! capability traits the experiment runtime drives, the frame type, stage
//! geometry, travel windows, and the workspace error type.
//!
//! ## Key Types
//!
//! - [`Microscope`]: blanket bundle of every hardware capability
//! - [`Frame`]: single grayscale camera frame
//! - [`Coordinate`] / [`Axis`]: stage positions and axis names
//! - [`TravelWindow`]: exclusive per-axis bounds around the stage origin
//! - [`ScopeError`]: error taxonomy (configuration, hardware, storage)

pub mod capabilities;
pub mod data;
pub mod error;
pub mod geometry;
pub mod limits;

pub use capabilities::{
    snap_image, ChannelControl, ExposureControl, FocusDrive, FrameProducer, Microscope,
    RoiControl, ShutterControl, XyStage,
};
pub use data::Frame;
pub use error::{DriverError, DriverErrorKind, ScopeError, ScopeResult};
pub use geometry::{Axis, Coordinate};
pub use limits::TravelWindow;

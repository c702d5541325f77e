//! Atomic Hardware Capabilities
//!
//! The experiment runtime never speaks a device protocol. It drives the
//! microscope through small capability traits, each covering one concern:
//!
//! - A motorized stage implements: `XyStage + FocusDrive`
//! - A filter/illumination controller implements: `ChannelControl + ShutterControl`
//! - A camera implements: `ExposureControl + FrameProducer + RoiControl`
//!
//! A full instrument bundles all of them and gets [`Microscope`] for free
//! through the blanket impl at the bottom of this module.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Takes `&self`; implementations keep state behind interior mutability
//! - Returns [`ScopeResult`], hardware faults surface as [`ScopeError::Driver`]
//!
//! Calls are synchronous from the caller's point of view: when the future
//! resolves the device has accepted the command. There is no acknowledgment
//! beyond that and no partial-failure handling.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn dark_frame<M: Microscope + ?Sized>(scope: &M) -> ScopeResult<Frame> {
//!     let previous = scope.exposure().await?;
//!     scope.set_exposure(0.0).await?;
//!     scope.set_auto_shutter(false).await?;
//!     scope.set_shutter_open(false).await?;
//!     let frame = snap_image(scope).await?;
//!     scope.set_exposure(previous).await?;
//!     scope.set_auto_shutter(true).await?;
//!     Ok(frame)
//! }
//! ```
//!
//! [`ScopeError::Driver`]: crate::error::ScopeError::Driver

use crate::data::Frame;
use crate::error::ScopeResult;
use async_trait::async_trait;

/// Capability: Lateral Stage Motion
///
/// # Contract
/// - Positions are absolute, in stage-native units
/// - `set_xy_position` returns once the controller accepted the move
#[async_trait]
pub trait XyStage: Send + Sync {
    /// Current `(x, y)` position.
    async fn xy_position(&self) -> ScopeResult<(f64, f64)>;

    /// Move to absolute `(x, y)`.
    async fn set_xy_position(&self, x: f64, y: f64) -> ScopeResult<()>;
}

/// Capability: Focus Drive
#[async_trait]
pub trait FocusDrive: Send + Sync {
    /// Current z position.
    async fn z_position(&self) -> ScopeResult<f64>;

    /// Move focus to absolute z.
    async fn set_z_position(&self, z: f64) -> ScopeResult<()>;
}

/// Capability: Channel (filter / illumination preset) Selection
///
/// A channel is a named configuration preset such as `GFP` or `mCherry`.
#[async_trait]
pub trait ChannelControl: Send + Sync {
    /// Name of the active channel preset.
    async fn channel(&self) -> ScopeResult<String>;

    /// Activate a channel preset.
    async fn set_channel(&self, name: &str) -> ScopeResult<()>;
}

/// Capability: Exposure Time Control
///
/// # Contract
/// - Exposure is in the camera's native unit (milliseconds for most bridges)
/// - Setting exposure does not start acquisition
#[async_trait]
pub trait ExposureControl: Send + Sync {
    /// Current exposure setting.
    async fn exposure(&self) -> ScopeResult<f64>;

    /// Set exposure for subsequent acquisitions.
    async fn set_exposure(&self, exposure: f64) -> ScopeResult<()>;
}

/// Capability: Shutter Control
///
/// With auto-shutter enabled the controller opens the shutter for the
/// duration of each snap. Induction pulses disable it and drive the shutter
/// directly.
#[async_trait]
pub trait ShutterControl: Send + Sync {
    /// Enable or disable automatic shutter handling around snaps.
    async fn set_auto_shutter(&self, enabled: bool) -> ScopeResult<()>;

    /// Open or close the shutter.
    async fn set_shutter_open(&self, open: bool) -> ScopeResult<()>;
}

/// Capability: Single-Frame Acquisition
#[async_trait]
pub trait FrameProducer: Send + Sync {
    /// Block until every device in the acquisition path has settled.
    async fn wait_for_system(&self) -> ScopeResult<()>;

    /// Discard any frames sitting in the acquisition buffer.
    async fn clear_buffer(&self) -> ScopeResult<()>;

    /// Acquire exactly one frame.
    async fn snap(&self) -> ScopeResult<Frame>;

    /// Camera bit depth.
    async fn bit_depth(&self) -> ScopeResult<u32>;

    /// Start a free-running acquisition (used while picking positions).
    async fn start_continuous(&self) -> ScopeResult<()>;

    /// Stop a free-running acquisition.
    async fn stop_continuous(&self) -> ScopeResult<()>;
}

/// Capability: Sensor Region of Interest
#[async_trait]
pub trait RoiControl: Send + Sync {
    /// Restrict readout to a sensor rectangle.
    async fn set_roi(&self, x: u32, y: u32, width: u32, height: u32) -> ScopeResult<()>;

    /// Restore full-sensor readout.
    async fn clear_roi(&self) -> ScopeResult<()>;
}

/// Full hardware boundary consumed by the experiment runtime.
pub trait Microscope:
    XyStage + FocusDrive + ChannelControl + ExposureControl + ShutterControl + FrameProducer + RoiControl
{
}

impl<T> Microscope for T where
    T: XyStage
        + FocusDrive
        + ChannelControl
        + ExposureControl
        + ShutterControl
        + FrameProducer
        + RoiControl
{
}

/// Snap a fresh frame: settle, flush stale buffer contents, acquire.
pub async fn snap_image<M>(scope: &M) -> ScopeResult<Frame>
where
    M: FrameProducer + ?Sized,
{
    scope.wait_for_system().await?;
    scope.clear_buffer().await?;
    scope.snap().await
}

//! Mock microscope implementing every hardware capability.

use crate::common::{FaultPlan, MockMode, MockRng, Operation, TimingConfig};
use crate::pattern::{generate_focus_pattern, sharpness};
use async_trait::async_trait;
use scope_core::capabilities::{
    ChannelControl, ExposureControl, FocusDrive, FrameProducer, RoiControl, ShutterControl,
    XyStage,
};
use scope_core::data::Frame;
use scope_core::error::ScopeResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

const DEVICE_NAME: &str = "mock_microscope";

/// A state-changing command received by the mock.
///
/// Queries (`xy_position`, `channel`, ...) are not logged.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareCall {
    /// Lateral stage move
    SetXy {
        /// Target X
        x: f64,
        /// Target Y
        y: f64,
    },
    /// Focus move
    SetZ(f64),
    /// Channel preset change
    SetChannel(String),
    /// Exposure change
    SetExposure(f64),
    /// Auto-shutter toggle
    SetAutoShutter(bool),
    /// Manual shutter open/close
    SetShutterOpen(bool),
    /// Single acquisition, with the state it was taken in
    Snap {
        /// Stage X at acquisition time
        x: f64,
        /// Stage Y at acquisition time
        y: f64,
        /// Focus at acquisition time
        z: f64,
        /// Active channel at acquisition time
        channel: String,
    },
    /// ROI applied
    SetRoi(u32, u32, u32, u32),
    /// ROI cleared
    ClearRoi,
    /// Continuous acquisition started
    StartContinuous,
    /// Continuous acquisition stopped
    StopContinuous,
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug)]
struct ScopeState {
    x: f64,
    y: f64,
    z: f64,
    channel: String,
    exposure_ms: f64,
    auto_shutter: bool,
    shutter_open: bool,
    roi: Option<(u32, u32, u32, u32)>,
    continuous: bool,
    frame_count: u64,
    calls: Vec<HardwareCall>,
}

// =============================================================================
// MockMicroscope
// =============================================================================

/// Simulated motorized microscope.
///
/// Simulates:
/// - XY stage and focus drive with optional settling time
/// - Channel presets, exposure, auto-shutter and manual shutter
/// - A specimen with a single focal plane: frame contrast falls off with defocus
/// - Sensor ROI
/// - Error injection for testing
///
/// Every state-changing call is appended to a call log, see [`MockMicroscope::calls`].
///
/// # Example
///
/// ```rust,ignore
/// let scope = MockMicroscope::builder()
///     .position(100.0, 200.0, 50.0)
///     .focal_plane(55.0)
///     .build();
///
/// scope.set_channel("GFP").await?;
/// let frame = snap_image(&scope).await?;
/// ```
#[derive(Clone)]
pub struct MockMicroscope {
    state: Arc<Mutex<ScopeState>>,
    resolution: (u32, u32),
    focal_plane: f64,
    depth_of_field: f64,
    mode: MockMode,
    timing: TimingConfig,
    faults: FaultPlan,
    rng: Arc<MockRng>,
    record_calls: bool,
}

impl MockMicroscope {
    /// Create a mock at the origin with default optics.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring MockMicroscope
    pub fn builder() -> MockMicroscopeBuilder {
        MockMicroscopeBuilder::new()
    }

    /// Snapshot of the call log.
    pub async fn calls(&self) -> Vec<HardwareCall> {
        self.state.lock().await.calls.clone()
    }

    /// Only the acquisitions from the call log.
    pub async fn snaps(&self) -> Vec<HardwareCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, HardwareCall::Snap { .. }))
            .collect()
    }

    /// Empty the call log.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Whether the shutter is currently held open.
    pub async fn is_shutter_open(&self) -> bool {
        self.state.lock().await.shutter_open
    }

    /// Whether auto-shutter is enabled.
    pub async fn is_auto_shutter(&self) -> bool {
        self.state.lock().await.auto_shutter
    }

    /// Active ROI, if any.
    pub async fn roi(&self) -> Option<(u32, u32, u32, u32)> {
        self.state.lock().await.roi
    }

    /// Total frames acquired.
    pub async fn frame_count(&self) -> u64 {
        self.state.lock().await.frame_count
    }

    /// Absolute z of the simulated specimen.
    pub fn focal_plane(&self) -> f64 {
        self.focal_plane
    }

    async fn delay(&self, duration: Duration) {
        if !self.mode.is_timed() || duration.is_zero() {
            return;
        }
        let spread = self.mode.jitter_fraction();
        let duration = if spread > 0.0 {
            duration.mul_f64(1.0 + self.rng.jitter(spread))
        } else {
            duration
        };
        sleep(duration).await;
    }

    fn log(&self, state: &mut ScopeState, call: HardwareCall) {
        if self.record_calls {
            state.calls.push(call);
        }
    }

    fn check(&self, op: Operation) -> ScopeResult<()> {
        self.faults.check(DEVICE_NAME, op)?;
        Ok(())
    }
}

impl Default for MockMicroscope {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl XyStage for MockMicroscope {
    async fn xy_position(&self) -> ScopeResult<(f64, f64)> {
        let state = self.state.lock().await;
        Ok((state.x, state.y))
    }

    async fn set_xy_position(&self, x: f64, y: f64) -> ScopeResult<()> {
        self.check(Operation::MoveXy)?;
        tracing::debug!("MockMicroscope: XY -> ({:.1}, {:.1})", x, y);
        {
            let mut state = self.state.lock().await;
            state.x = x;
            state.y = y;
            self.log(&mut state, HardwareCall::SetXy { x, y });
        }
        self.delay(self.timing.settle()).await;
        Ok(())
    }
}

#[async_trait]
impl FocusDrive for MockMicroscope {
    async fn z_position(&self) -> ScopeResult<f64> {
        Ok(self.state.lock().await.z)
    }

    async fn set_z_position(&self, z: f64) -> ScopeResult<()> {
        self.check(Operation::MoveZ)?;
        tracing::debug!("MockMicroscope: Z -> {:.2}", z);
        {
            let mut state = self.state.lock().await;
            state.z = z;
            self.log(&mut state, HardwareCall::SetZ(z));
        }
        self.delay(self.timing.settle()).await;
        Ok(())
    }
}

#[async_trait]
impl ChannelControl for MockMicroscope {
    async fn channel(&self) -> ScopeResult<String> {
        Ok(self.state.lock().await.channel.clone())
    }

    async fn set_channel(&self, name: &str) -> ScopeResult<()> {
        self.check(Operation::SetChannel)?;
        {
            let mut state = self.state.lock().await;
            state.channel = name.to_string();
            self.log(&mut state, HardwareCall::SetChannel(name.to_string()));
        }
        self.delay(self.timing.command()).await;
        Ok(())
    }
}

#[async_trait]
impl ExposureControl for MockMicroscope {
    async fn exposure(&self) -> ScopeResult<f64> {
        Ok(self.state.lock().await.exposure_ms)
    }

    async fn set_exposure(&self, exposure: f64) -> ScopeResult<()> {
        self.check(Operation::SetExposure)?;
        let mut state = self.state.lock().await;
        state.exposure_ms = exposure;
        self.log(&mut state, HardwareCall::SetExposure(exposure));
        Ok(())
    }
}

#[async_trait]
impl ShutterControl for MockMicroscope {
    async fn set_auto_shutter(&self, enabled: bool) -> ScopeResult<()> {
        self.check(Operation::Shutter)?;
        let mut state = self.state.lock().await;
        state.auto_shutter = enabled;
        self.log(&mut state, HardwareCall::SetAutoShutter(enabled));
        Ok(())
    }

    async fn set_shutter_open(&self, open: bool) -> ScopeResult<()> {
        self.check(Operation::Shutter)?;
        {
            let mut state = self.state.lock().await;
            state.shutter_open = open;
            self.log(&mut state, HardwareCall::SetShutterOpen(open));
        }
        self.delay(self.timing.command()).await;
        Ok(())
    }
}

#[async_trait]
impl FrameProducer for MockMicroscope {
    async fn wait_for_system(&self) -> ScopeResult<()> {
        self.delay(self.timing.command()).await;
        Ok(())
    }

    async fn clear_buffer(&self) -> ScopeResult<()> {
        Ok(())
    }

    async fn snap(&self) -> ScopeResult<Frame> {
        self.check(Operation::Snap)?;

        let (exposure_ms, z, frame_num, (width, height)) = {
            let mut state = self.state.lock().await;
            state.frame_count += 1;
            let call = HardwareCall::Snap {
                x: state.x,
                y: state.y,
                z: state.z,
                channel: state.channel.clone(),
            };
            self.log(&mut state, call);
            let dims = state.roi.map(|(_, _, w, h)| (w, h)).unwrap_or(self.resolution);
            (state.exposure_ms, state.z, state.frame_count, dims)
        };

        self.delay(self.timing.snap(exposure_ms)).await;

        let s = sharpness(z, self.focal_plane, self.depth_of_field);
        let pixels = generate_focus_pattern(width, height, s, frame_num);
        tracing::debug!(frame_num, z, sharpness = s, "MockMicroscope: snap");
        Ok(Frame::from_u16(width, height, &pixels))
    }

    async fn bit_depth(&self) -> ScopeResult<u32> {
        Ok(16)
    }

    async fn start_continuous(&self) -> ScopeResult<()> {
        self.check(Operation::Continuous)?;
        let mut state = self.state.lock().await;
        state.continuous = true;
        self.log(&mut state, HardwareCall::StartContinuous);
        Ok(())
    }

    async fn stop_continuous(&self) -> ScopeResult<()> {
        self.check(Operation::Continuous)?;
        let mut state = self.state.lock().await;
        state.continuous = false;
        self.log(&mut state, HardwareCall::StopContinuous);
        Ok(())
    }
}

#[async_trait]
impl RoiControl for MockMicroscope {
    async fn set_roi(&self, x: u32, y: u32, width: u32, height: u32) -> ScopeResult<()> {
        self.check(Operation::Roi)?;
        let mut state = self.state.lock().await;
        state.roi = Some((x, y, width, height));
        self.log(&mut state, HardwareCall::SetRoi(x, y, width, height));
        Ok(())
    }

    async fn clear_roi(&self) -> ScopeResult<()> {
        self.check(Operation::Roi)?;
        let mut state = self.state.lock().await;
        state.roi = None;
        self.log(&mut state, HardwareCall::ClearRoi);
        Ok(())
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for MockMicroscope with fluent API
pub struct MockMicroscopeBuilder {
    position: (f64, f64, f64),
    channel: String,
    exposure_ms: f64,
    resolution: (u32, u32),
    focal_plane: f64,
    depth_of_field: f64,
    mode: MockMode,
    timing: TimingConfig,
    faults: FaultPlan,
    seed: Option<u64>,
    record_calls: bool,
}

impl MockMicroscopeBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            position: (0.0, 0.0, 0.0),
            channel: "DIC".to_string(),
            exposure_ms: 100.0,
            resolution: (64, 64),
            focal_plane: 0.0,
            depth_of_field: 5.0,
            mode: MockMode::Instant,
            timing: TimingConfig::microscope(),
            faults: FaultPlan::none(),
            seed: None,
            record_calls: true,
        }
    }

    /// Set initial stage position
    pub fn position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.position = (x, y, z);
        self
    }

    /// Set initial channel preset
    pub fn channel(mut self, name: impl Into<String>) -> Self {
        self.channel = name.into();
        self
    }

    /// Set initial exposure (ms)
    pub fn exposure(mut self, exposure_ms: f64) -> Self {
        self.exposure_ms = exposure_ms;
        self
    }

    /// Set full-sensor resolution
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Set absolute z of the specimen
    pub fn focal_plane(mut self, z: f64) -> Self {
        self.focal_plane = z;
        self
    }

    /// Set defocus half-width of the sharpness curve
    pub fn depth_of_field(mut self, depth: f64) -> Self {
        self.depth_of_field = depth;
        self
    }

    /// Set operational mode
    pub fn mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set realistic-mode timing
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Inject device faults
    pub fn faults(mut self, plan: FaultPlan) -> Self {
        self.faults = plan;
        self
    }

    /// Seed the latency jitter of chaos mode
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Keep a log of state-changing calls (on by default).
    ///
    /// Long unattended runs should turn it off, the log is never trimmed.
    pub fn call_log(mut self, enabled: bool) -> Self {
        self.record_calls = enabled;
        self
    }

    /// Build the MockMicroscope
    pub fn build(self) -> MockMicroscope {
        let (x, y, z) = self.position;
        MockMicroscope {
            state: Arc::new(Mutex::new(ScopeState {
                x,
                y,
                z,
                channel: self.channel,
                exposure_ms: self.exposure_ms,
                auto_shutter: true,
                shutter_open: false,
                roi: None,
                continuous: false,
                frame_count: 0,
                calls: Vec::new(),
            })),
            resolution: self.resolution,
            focal_plane: self.focal_plane,
            depth_of_field: self.depth_of_field,
            mode: self.mode,
            timing: self.timing,
            faults: self.faults,
            rng: Arc::new(MockRng::new(self.seed)),
            record_calls: self.record_calls,
        }
    }
}

impl Default for MockMicroscopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

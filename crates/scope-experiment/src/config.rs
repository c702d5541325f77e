//! Experiment configuration loaded with Figment
//!
//! Configuration is loaded from:
//! 1. Built-in defaults
//! 2. A TOML file (usually `config/scope.toml`)
//! 3. Environment variables prefixed with `SCOPE_`, nested keys separated by `__`
//!
//! # Example
//! ```no_run
//! use scope_experiment::config::ScopeConfig;
//!
//! let config = ScopeConfig::load_from("config/scope.toml")?;
//! println!("Saving under {:?}", config.save_root);
//! # Ok::<(), scope_core::ScopeError>(())
//! ```
//!
//! ```toml
//! topology = "parallel"
//! roi_center = true
//!
//! [stage]
//! z_limit = [-240.0, 240.0]
//!
//! [imaging]
//! windows = [[0.0, 3600.0, 60.0]]
//! channels = ["DIC", "mCherry"]
//!
//! [induction]
//! windows = [[60.0, 301.0, 60.0, 1.0]]
//! channel = "BL1"
//! ```

use crate::task::{AutofocusParams, PulseWindow, TimeWindow};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use scope_core::error::{ScopeError, ScopeResult};
use scope_core::limits::{DEFAULT_X_LIMIT, DEFAULT_Y_LIMIT, DEFAULT_Z_LIMIT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides, e.g. `SCOPE_TOPOLOGY=parallel`.
pub const ENV_PREFIX: &str = "SCOPE_";

/// How tasks are spread over the registered sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// One site, the active one.
    #[default]
    Single,
    /// Full experiment per site, one site after another, clock reset per site.
    Sequential,
    /// Every due task visits every site in registry order.
    Parallel,
}

impl Topology {
    /// Whether the run involves more than the origin site, so the operator
    /// should be offered a picker session first.
    pub fn is_multi_position(self) -> bool {
        !matches!(self, Topology::Single)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Single => write!(f, "single"),
            Topology::Sequential => write!(f, "sequential"),
            Topology::Parallel => write!(f, "parallel"),
        }
    }
}

/// Stage travel limits as `[lower, upper]` offsets from the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// X travel relative to the origin
    #[serde(default = "default_x_limit")]
    pub x_limit: [f64; 2],
    /// Y travel relative to the origin
    #[serde(default = "default_y_limit")]
    pub y_limit: [f64; 2],
    /// Z travel relative to the origin
    #[serde(default = "default_z_limit")]
    pub z_limit: [f64; 2],
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            x_limit: DEFAULT_X_LIMIT,
            y_limit: DEFAULT_Y_LIMIT,
            z_limit: DEFAULT_Z_LIMIT,
        }
    }
}

/// Time-lapse imaging windows `[start, stop, period]` and channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingConfig {
    /// One task per window
    pub windows: Vec<[f64; 3]>,
    /// Channels acquired at every firing, in order
    pub channels: Vec<String>,
}

/// Induction pulse windows `[start, stop, period, width]` and the light channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InductionConfig {
    /// One task per window
    pub windows: Vec<[f64; 4]>,
    /// Channel preset that routes the stimulation light
    pub channel: String,
}

/// Autofocus windows `[start, stop, period]` and scan parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutofocusConfig {
    /// One task per window
    pub windows: Vec<[f64; 3]>,
    /// Channel used for focus frames
    pub channel: String,
    /// Scan range relative to the current z
    #[serde(default = "default_af_bounds")]
    pub bounds: [f64; 2],
    /// Scan step
    #[serde(default = "default_af_step")]
    pub z_step: f64,
    /// Added to the best-scoring z before moving there
    #[serde(default)]
    pub offset: f64,
}

impl AutofocusConfig {
    /// Scan parameters carried by every queued autofocus task.
    pub fn params(&self) -> AutofocusParams {
        AutofocusParams {
            channel: self.channel.clone(),
            bounds: self.bounds,
            z_step: self.z_step,
            offset: self.offset,
        }
    }
}

/// Top-level experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Base directory experiment directories are created in
    #[serde(default = "default_save_root")]
    pub save_root: PathBuf,
    /// Stage travel limits
    #[serde(default)]
    pub stage: StageConfig,
    /// Multi-position mode
    #[serde(default)]
    pub topology: Topology,
    /// Channel shown while the operator picks positions
    #[serde(default = "default_picker_channel")]
    pub picker_channel: String,
    /// Crop acquisition to the centered ROI for the run
    #[serde(default)]
    pub roi_center: bool,
    /// Sleep between scheduler ticks when nothing fired
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Channel selected for the dark warm-up frame, if any
    #[serde(default)]
    pub warmup_channel: Option<String>,
    /// Time-lapse imaging
    #[serde(default)]
    pub imaging: Option<ImagingConfig>,
    /// Optogenetic induction
    #[serde(default)]
    pub induction: Option<InductionConfig>,
    /// Periodic refocusing
    #[serde(default)]
    pub autofocus: Option<AutofocusConfig>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            save_root: default_save_root(),
            stage: StageConfig::default(),
            topology: Topology::default(),
            picker_channel: default_picker_channel(),
            roi_center: false,
            poll_interval_ms: default_poll_interval_ms(),
            warmup_channel: None,
            imaging: None,
            induction: None,
            autofocus: None,
        }
    }
}

fn default_save_root() -> PathBuf {
    PathBuf::from("expts")
}

fn default_picker_channel() -> String {
    "DIC".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1
}

fn default_x_limit() -> [f64; 2] {
    DEFAULT_X_LIMIT
}

fn default_y_limit() -> [f64; 2] {
    DEFAULT_Y_LIMIT
}

fn default_z_limit() -> [f64; 2] {
    DEFAULT_Z_LIMIT
}

fn default_af_bounds() -> [f64; 2] {
    [-10.0, 10.0]
}

fn default_af_step() -> f64 {
    5.0
}

impl ScopeConfig {
    /// Figment stack: defaults, then `path`, then `SCOPE_*` environment.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(ScopeConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration from a TOML file plus environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ScopeResult<Self> {
        Self::from_figment(Self::figment(path))
    }

    /// Extract and validate from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> ScopeResult<Self> {
        let config: ScopeConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Tick sleep as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Semantic checks the deserializer cannot express.
    pub fn validate(&self) -> ScopeResult<()> {
        check_limit("stage.x_limit", self.stage.x_limit)?;
        check_limit("stage.y_limit", self.stage.y_limit)?;
        check_limit("stage.z_limit", self.stage.z_limit)?;

        if self.picker_channel.trim().is_empty() {
            return Err(invalid("picker_channel must not be empty".into()));
        }

        if let Some(imaging) = &self.imaging {
            if imaging.channels.is_empty() {
                return Err(invalid("imaging.channels must list at least one channel".into()));
            }
            for window in &imaging.windows {
                TimeWindow::from(*window).validate("imaging")?;
            }
        }

        if let Some(induction) = &self.induction {
            if induction.channel.trim().is_empty() {
                return Err(invalid("induction.channel must not be empty".into()));
            }
            for window in &induction.windows {
                PulseWindow::from(*window).validate("induction")?;
            }
        }

        if let Some(autofocus) = &self.autofocus {
            if autofocus.channel.trim().is_empty() {
                return Err(invalid("autofocus.channel must not be empty".into()));
            }
            if !(autofocus.z_step.is_finite() && autofocus.z_step > 0.0) {
                return Err(invalid(format!(
                    "autofocus.z_step must be positive, got {}",
                    autofocus.z_step
                )));
            }
            if autofocus.bounds[0] >= autofocus.bounds[1] {
                return Err(invalid(format!(
                    "autofocus.bounds must satisfy lower < upper, got {:?}",
                    autofocus.bounds
                )));
            }
            for window in &autofocus.windows {
                TimeWindow::from(*window).validate("autofocus")?;
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> ScopeError {
    ScopeError::Configuration(message)
}

fn check_limit(name: &str, limit: [f64; 2]) -> ScopeResult<()> {
    if limit[0].is_finite() && limit[1].is_finite() && limit[0] < limit[1] {
        Ok(())
    } else {
        Err(invalid(format!(
            "{} must satisfy lower < upper, got {:?}",
            name, limit
        )))
    }
}

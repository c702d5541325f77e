//! Experiment orchestration for time-lapse microscopy.
//!
//! # Modules
//!
//! - [`config`]: Figment-backed experiment configuration
//! - [`registry`]: ordered stage sites and travel-checked moves
//! - [`picker`]: interactive site picking session
//! - [`task`]: imaging, induction and autofocus tasks and their due times
//! - [`focus`]: Laplacian-variance focus scoring
//! - [`scheduler`]: single-clock task scheduler
//! - [`runner`]: topology-aware experiment driver
//! - [`snapshot`]: one-shot z-stack and xy field acquisitions
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ScopeConfig::load_from("config/scope.toml")?;
//! let registry = PositionRegistry::new(&*hw, &config.stage).await?;
//! let recorder = SessionRecorder::new(SessionLayout::new(&session_dir));
//! let scheduler = Scheduler::new(hw, registry, recorder, config.topology);
//!
//! Experiment::new(scheduler, ExperimentPlan::from_config(&config))
//!     .with_poll_interval(config.poll_interval())
//!     .with_roi_center(config.roi_center)
//!     .run()
//!     .await?;
//! ```

pub mod config;
pub mod focus;
pub mod picker;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod snapshot;
pub mod task;

pub use config::{ScopeConfig, StageConfig, Topology};
pub use picker::{run_picker_session, PickerCommand};
pub use registry::{AxisPosition, PositionRegistry};
pub use runner::{warm_up_camera, Experiment, ExperimentPlan};
pub use scheduler::{Scheduler, TickOutcome};
pub use task::{AutofocusParams, PulseWindow, Task, TaskKind, TimeWindow};

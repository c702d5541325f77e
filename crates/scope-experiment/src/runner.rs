//! Experiment runner
//!
//! Queues a configured [`ExperimentPlan`] on a [`Scheduler`] and drives it to
//! completion according to the topology:
//!
//! - `single` / `parallel`: queue everything once, reset the clock, drain.
//! - `sequential`: for each site id in turn, queue everything, make that site
//!   active, reset the clock, drain. Every site gets the full duration.
//!
//! With `roi_center` the camera is cropped to [`CENTER_ROI`] for the run and
//! restored afterwards.

use crate::config::{ScopeConfig, Topology};
use crate::scheduler::Scheduler;
use crate::task::{AutofocusParams, PulseWindow, TimeWindow};
use scope_core::capabilities::{
    snap_image, ChannelControl, ExposureControl, Microscope, RoiControl, ShutterControl,
};
use scope_core::error::ScopeResult;
use scope_core::limits::{CENTER_ROI, DEFAULT_POLL_INTERVAL};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Imaging part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingPlan {
    /// One task per window
    pub windows: Vec<TimeWindow>,
    /// Channels per firing
    pub channels: Vec<String>,
}

/// Induction part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct InductionPlan {
    /// One task per window
    pub windows: Vec<PulseWindow>,
    /// Stimulation channel
    pub channel: String,
}

/// Autofocus part of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct AutofocusPlan {
    /// One task per window
    pub windows: Vec<TimeWindow>,
    /// Scan parameters
    pub params: AutofocusParams,
}

/// Everything queued at the start of a run (or of each sequential site).
///
/// Sections are queued imaging first, then induction, then autofocus, which
/// fixes their firing priority when several are due in the same tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentPlan {
    /// Time-lapse imaging
    pub imaging: Option<ImagingPlan>,
    /// Light pulses
    pub induction: Option<InductionPlan>,
    /// Refocusing
    pub autofocus: Option<AutofocusPlan>,
}

impl ExperimentPlan {
    /// Plan described by the configuration file.
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            imaging: config.imaging.as_ref().map(|c| ImagingPlan {
                windows: c.windows.iter().copied().map(TimeWindow::from).collect(),
                channels: c.channels.clone(),
            }),
            induction: config.induction.as_ref().map(|c| InductionPlan {
                windows: c.windows.iter().copied().map(PulseWindow::from).collect(),
                channel: c.channel.clone(),
            }),
            autofocus: config.autofocus.as_ref().map(|c| AutofocusPlan {
                windows: c.windows.iter().copied().map(TimeWindow::from).collect(),
                params: c.params(),
            }),
        }
    }

    /// Whether nothing would be queued.
    pub fn is_empty(&self) -> bool {
        self.imaging.is_none() && self.induction.is_none() && self.autofocus.is_none()
    }

    /// Queue every section on `scheduler`.
    pub fn queue_on<H: Microscope + ?Sized>(&self, scheduler: &mut Scheduler<H>) -> ScopeResult<()> {
        if let Some(imaging) = &self.imaging {
            scheduler.queue_imaging(&imaging.windows, &imaging.channels)?;
        }
        if let Some(induction) = &self.induction {
            scheduler.queue_induction(&induction.windows, &induction.channel)?;
        }
        if let Some(autofocus) = &self.autofocus {
            scheduler.queue_autofocus(&autofocus.windows, &autofocus.params);
        }
        Ok(())
    }
}

/// A plan bound to a scheduler.
pub struct Experiment<H: Microscope + ?Sized> {
    scheduler: Scheduler<H>,
    plan: ExperimentPlan,
    poll_interval: Duration,
    roi_center: bool,
}

impl<H: Microscope + ?Sized> Experiment<H> {
    /// Experiment with the default poll interval and full-sensor readout.
    pub fn new(scheduler: Scheduler<H>, plan: ExperimentPlan) -> Self {
        Self {
            scheduler,
            plan,
            poll_interval: DEFAULT_POLL_INTERVAL,
            roi_center: false,
        }
    }

    /// Sleep between idle ticks.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll_interval = poll;
        self
    }

    /// Crop acquisition to the centered ROI for the run.
    pub fn with_roi_center(mut self, enabled: bool) -> Self {
        self.roi_center = enabled;
        self
    }

    /// Underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler<H> {
        &self.scheduler
    }

    /// Underlying scheduler, e.g. for a picker session before [`Experiment::run`].
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<H> {
        &mut self.scheduler
    }

    /// Consume the experiment, keeping the scheduler state.
    pub fn into_scheduler(self) -> Scheduler<H> {
        self.scheduler
    }

    /// Run the plan to completion. A hardware or storage fault aborts the run
    /// and is returned.
    pub async fn run(&mut self) -> ScopeResult<()> {
        let hw = std::sync::Arc::clone(self.scheduler.hardware());
        let started = Instant::now();
        info!(
            topology = %self.scheduler.topology(),
            sites = self.scheduler.registry().len(),
            "Experiment started"
        );

        hw.clear_roi().await?;
        if self.roi_center {
            let (x, y, w, h) = CENTER_ROI;
            hw.set_roi(x, y, w, h).await?;
        }

        let result = self.drive().await;

        if self.roi_center {
            hw.clear_roi().await?;
        }
        result?;

        info!(
            duration_secs = started.elapsed().as_secs_f64(),
            "Experiment finished"
        );
        Ok(())
    }

    async fn drive(&mut self) -> ScopeResult<()> {
        match self.scheduler.topology() {
            Topology::Sequential => {
                for site in 0..self.scheduler.registry().len() {
                    self.plan.queue_on(&mut self.scheduler)?;
                    self.scheduler.set_active_site(site)?;
                    self.scheduler.reset_clock();
                    info!(site, "Sequential site started");
                    self.scheduler.run_until_done(self.poll_interval).await?;
                }
                Ok(())
            }
            Topology::Single | Topology::Parallel => {
                self.plan.queue_on(&mut self.scheduler)?;
                self.scheduler.reset_clock();
                self.scheduler.run_until_done(self.poll_interval).await
            }
        }
    }
}

/// Take one dark frame so the camera settles before the first real
/// acquisition. Exposure and auto-shutter are restored afterwards.
pub async fn warm_up_camera<H>(hw: &H, channel: Option<&str>) -> ScopeResult<()>
where
    H: Microscope + ?Sized,
{
    let exposure = hw.exposure().await?;
    hw.set_exposure(0.0).await?;
    if let Some(channel) = channel {
        hw.set_channel(channel).await?;
    }
    hw.set_auto_shutter(false).await?;
    hw.set_shutter_open(false).await?;
    let frame = snap_image(hw).await?;
    hw.set_exposure(exposure).await?;
    hw.set_auto_shutter(true).await?;
    debug!(width = frame.width, height = frame.height, "Camera warm-up frame discarded");
    Ok(())
}

//! Task scheduler
//!
//! The scheduler owns everything a run mutates: the hardware handle, the
//! position registry, the session recorder, the task list and the experiment
//! clock. Nothing is shared; a tick borrows the scheduler mutably and runs
//! every due action to completion before it returns.
//!
//! # Tick
//!
//! ```text
//! run_tasks()
//!   tasks empty?            -> Done
//!   for task in list order:
//!     elapsed >= next_due?  -> for site in targets: move xy, execute
//!                              pop next_due
//!   drop exhausted tasks    (after the pass, never during it)
//!   -> Fired(n) | Idle
//! ```
//!
//! Targets are the active site for `single` and `sequential`, and every site
//! in registry order for `parallel`. Actions are awaited inline, so an
//! induction hold blocks the whole lane, including the other sites of a
//! parallel broadcast.

use crate::config::Topology;
use crate::focus::{laplacian_variance, FocusSearch};
use crate::registry::PositionRegistry;
use crate::task::{arange, AutofocusParams, PulseWindow, Task, TaskKind, TimeWindow};
use scope_core::capabilities::{
    snap_image, ChannelControl, FocusDrive, Microscope, ShutterControl,
};
use scope_core::error::{ScopeError, ScopeResult};
use scope_core::geometry::Axis;
use scope_storage::SessionRecorder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Result of one [`Scheduler::run_tasks`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No task left.
    Done,
    /// Tasks remain but none was due.
    Idle,
    /// This many tasks fired.
    Fired(usize),
}

impl TickOutcome {
    /// Whether the run has drained.
    pub fn is_done(self) -> bool {
        matches!(self, TickOutcome::Done)
    }
}

/// Single-clock task scheduler over a set of sites.
pub struct Scheduler<H: Microscope + ?Sized> {
    hw: Arc<H>,
    registry: PositionRegistry,
    recorder: SessionRecorder,
    tasks: Vec<Task>,
    t0: Instant,
    active_site: usize,
    topology: Topology,
}

impl<H: Microscope + ?Sized> Scheduler<H> {
    /// Scheduler with an empty task list, clock started now, site 0 active.
    pub fn new(
        hw: Arc<H>,
        registry: PositionRegistry,
        recorder: SessionRecorder,
        topology: Topology,
    ) -> Self {
        Self {
            hw,
            registry,
            recorder,
            tasks: Vec::new(),
            t0: Instant::now(),
            active_site: 0,
            topology,
        }
    }

    /// Hardware handle.
    pub fn hardware(&self) -> &Arc<H> {
        &self.hw
    }

    /// Registered sites.
    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    /// Registered sites, for picker sessions between runs.
    pub fn registry_mut(&mut self) -> &mut PositionRegistry {
        &mut self.registry
    }

    /// Persistence collaborator.
    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Active topology.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Pending tasks in firing priority order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Site addressed outside the parallel topology.
    pub fn active_site(&self) -> usize {
        self.active_site
    }

    /// Queue one imaging task per window and prepare each channel's site
    /// directories for every registered site.
    pub fn queue_imaging(&mut self, windows: &[TimeWindow], channels: &[String]) -> ScopeResult<()> {
        for window in windows {
            self.push(Task::imaging(*window, channels.to_vec()));
        }
        self.recorder
            .prepare_imaging_dirs(channels, self.registry.len())
            .map_err(ScopeError::Storage)
    }

    /// Queue one induction task per window.
    pub fn queue_induction(&mut self, windows: &[PulseWindow], channel: &str) -> ScopeResult<()> {
        for window in windows {
            self.push(Task::induction(*window, channel)?);
        }
        Ok(())
    }

    /// Queue one autofocus task per window.
    pub fn queue_autofocus(&mut self, windows: &[TimeWindow], params: &AutofocusParams) {
        for window in windows {
            self.push(Task::autofocus(*window, params.clone()));
        }
    }

    fn push(&mut self, task: Task) {
        debug!(
            task = %task.kind,
            firings = task.due_times().len(),
            first = ?task.next_due(),
            "Queued task"
        );
        self.tasks.push(task);
    }

    /// Drop every pending task.
    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
    }

    /// Restart the experiment clock at now.
    pub fn reset_clock(&mut self) {
        self.t0 = Instant::now();
    }

    /// Seconds since the clock origin.
    pub fn elapsed(&self) -> f64 {
        self.t0.elapsed().as_secs_f64()
    }

    /// Address `site` in `single` and `sequential` runs.
    pub fn set_active_site(&mut self, site: usize) -> ScopeResult<()> {
        let len = self.registry.len();
        if site >= len {
            return Err(ScopeError::SiteOutOfRange { site, len });
        }
        self.active_site = site;
        Ok(())
    }

    /// One scheduler tick.
    ///
    /// Each task fires at most once. A hardware or storage error aborts the
    /// tick and is returned; the failing task keeps its due time.
    pub async fn run_tasks(&mut self) -> ScopeResult<TickOutcome> {
        if self.tasks.is_empty() {
            return Ok(TickOutcome::Done);
        }

        let mut tasks = std::mem::take(&mut self.tasks);
        let fired = self.fire_due(&mut tasks).await;
        tasks.retain(|task| !task.is_exhausted());
        self.tasks = tasks;

        match fired? {
            0 => Ok(TickOutcome::Idle),
            n => Ok(TickOutcome::Fired(n)),
        }
    }

    /// Tick until every task has drained, sleeping `poll` after idle ticks.
    pub async fn run_until_done(&mut self, poll: Duration) -> ScopeResult<()> {
        loop {
            match self.run_tasks().await? {
                TickOutcome::Done => return Ok(()),
                TickOutcome::Idle => sleep(poll).await,
                TickOutcome::Fired(_) => {}
            }
        }
    }

    async fn fire_due(&mut self, tasks: &mut [Task]) -> ScopeResult<usize> {
        let mut fired = 0;
        for task in tasks.iter_mut() {
            let elapsed = self.elapsed();
            if !task.is_due(elapsed) {
                continue;
            }
            debug!(task = task.kind.name(), due = ?task.next_due(), elapsed, "Task due");
            for site in self.target_sites() {
                self.registry.move_to(&*self.hw, site, Axis::Xy).await?;
                self.execute(&task.kind, site).await?;
            }
            task.pop_due();
            fired += 1;
        }
        Ok(fired)
    }

    fn target_sites(&self) -> Vec<usize> {
        match self.topology {
            Topology::Parallel => (0..self.registry.len()).collect(),
            Topology::Single | Topology::Sequential => vec![self.active_site],
        }
    }

    async fn execute(&mut self, kind: &TaskKind, site: usize) -> ScopeResult<()> {
        match kind {
            TaskKind::Imaging { channels } => self.take_images(site, channels).await,
            TaskKind::Induction { width, channel } => self.pulse_light(site, *width, channel).await,
            TaskKind::Autofocus(params) => self.autofocus(site, params).await,
        }
    }

    async fn take_images(&mut self, site: usize, channels: &[String]) -> ScopeResult<()> {
        let elapsed = self.elapsed();
        for channel in channels {
            self.hw.set_channel(channel).await?;
            let frame = snap_image(&*self.hw).await?;
            let path = self
                .recorder
                .save_frame(&frame, channel, site, elapsed)
                .map_err(ScopeError::Storage)?;
            debug!(site, channel = %channel, path = ?path, "Saved frame");
        }
        Ok(())
    }

    async fn pulse_light(&mut self, site: usize, width: Duration, channel: &str) -> ScopeResult<()> {
        self.hw.set_channel(channel).await?;
        self.hw.set_auto_shutter(false).await?;
        self.hw.set_shutter_open(true).await?;
        let ta = self.elapsed();
        sleep(width).await;
        let tb = self.elapsed();
        self.hw.set_shutter_open(false).await?;
        self.hw.set_auto_shutter(true).await?;

        self.recorder
            .record_pulse(site, ta, tb)
            .map_err(ScopeError::Storage)?;
        info!(site, ta, tb, "Induction pulse delivered");
        Ok(())
    }

    async fn autofocus(&mut self, site: usize, params: &AutofocusParams) -> ScopeResult<()> {
        self.hw.set_channel(&params.channel).await?;
        let zi = self.hw.z_position().await?;
        let mut search = FocusSearch::new(zi);

        for z in arange(zi + params.bounds[0], zi + params.bounds[1], params.z_step) {
            self.registry.move_z(&*self.hw, z).await?;
            let frame = snap_image(&*self.hw).await?;
            let score = laplacian_variance(&frame);
            if search.observe(z, score) {
                debug!(site, z, score, "New best focus");
            }
        }

        let target = search.best_z() + params.offset;
        self.registry.set_z(site, target)?;
        self.registry.move_z(&*self.hw, target).await?;
        info!(site, z = target, score = search.best_score(), "Autofocus complete");
        Ok(())
    }
}

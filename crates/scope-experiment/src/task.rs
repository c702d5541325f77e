//! Scheduled tasks
//!
//! A [`Task`] couples a [`TaskKind`] (what to do) with a queue of due times
//! (when to do it, in seconds since the experiment clock origin). Queuing a
//! window `(start, stop, period)` creates one task whose due times are
//! `start, start + period, ...` below `stop` (up to floating-point rounding,
//! see [`arange`]).
//!
//! ```rust,ignore
//! let window = TimeWindow::new(60.0, 301.0, 60.0);
//! assert_eq!(window.due_times(), [60.0, 120.0, 180.0, 240.0, 300.0]);
//! ```

use scope_core::error::{ScopeError, ScopeResult};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Evenly spaced values in `[start, stop)`, numpy `arange` style.
///
/// Produces `ceil((stop - start) / step)` values `start + i * step`, so the
/// final value is always computed from `start` rather than accumulated.
/// The upper bound only holds up to rounding: when `(stop - start) / step`
/// rounds up past a whole number, the last value can land on (or a hair past)
/// `stop`, e.g. `arange(1.0, 1.3, 0.1)` yields four values ending near `1.3`.
/// Empty when `step` is not a positive finite number or `stop <= start`.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0 && start.is_finite() && stop.is_finite()) {
        return Vec::new();
    }
    let count = ((stop - start) / step).ceil();
    if count <= 0.0 {
        return Vec::new();
    }
    (0..count as usize)
        .map(|i| start + i as f64 * step)
        .collect()
}

/// Imaging or autofocus window `(start, stop, period)`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    /// First firing
    pub start: f64,
    /// Exclusive end
    pub stop: f64,
    /// Spacing between firings
    pub period: f64,
}

impl TimeWindow {
    /// Build a window.
    pub fn new(start: f64, stop: f64, period: f64) -> Self {
        Self {
            start,
            stop,
            period,
        }
    }

    /// Expanded due times.
    pub fn due_times(&self) -> VecDeque<f64> {
        arange(self.start, self.stop, self.period).into()
    }

    /// Reject windows that can never expand sensibly. `label` names the
    /// owning section in the message.
    pub fn validate(&self, label: &str) -> ScopeResult<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(ScopeError::Configuration(format!(
                "{} window period must be positive, got {}",
                label, self.period
            )));
        }
        if !(self.start.is_finite() && self.stop.is_finite()) || self.start > self.stop {
            return Err(ScopeError::Configuration(format!(
                "{} window must satisfy start <= stop, got [{}, {}]",
                label, self.start, self.stop
            )));
        }
        Ok(())
    }
}

impl From<[f64; 3]> for TimeWindow {
    fn from(w: [f64; 3]) -> Self {
        Self::new(w[0], w[1], w[2])
    }
}

/// Induction window `(start, stop, period, width)`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseWindow {
    /// First pulse
    pub start: f64,
    /// Exclusive end
    pub stop: f64,
    /// Spacing between pulse onsets
    pub period: f64,
    /// Shutter-open hold per pulse
    pub width: f64,
}

impl PulseWindow {
    /// Build a window.
    pub fn new(start: f64, stop: f64, period: f64, width: f64) -> Self {
        Self {
            start,
            stop,
            period,
            width,
        }
    }

    /// Timing part of the window.
    pub fn timing(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.stop, self.period)
    }

    /// Pulse hold as a duration.
    pub fn hold(&self) -> ScopeResult<Duration> {
        Duration::try_from_secs_f64(self.width).map_err(|_| {
            ScopeError::Configuration(format!(
                "induction pulse width must be a non-negative number of seconds, got {}",
                self.width
            ))
        })
    }

    /// Reject unusable windows, see [`TimeWindow::validate`].
    pub fn validate(&self, label: &str) -> ScopeResult<()> {
        self.timing().validate(label)?;
        self.hold().map(|_| ())
    }
}

impl From<[f64; 4]> for PulseWindow {
    fn from(w: [f64; 4]) -> Self {
        Self::new(w[0], w[1], w[2], w[3])
    }
}

/// Autofocus scan parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AutofocusParams {
    /// Channel used for focus frames
    pub channel: String,
    /// Scan range `[lower, upper)` relative to the z at scan start
    pub bounds: [f64; 2],
    /// Scan step
    pub z_step: f64,
    /// Added to the best-scoring z
    pub offset: f64,
}

impl Default for AutofocusParams {
    fn default() -> Self {
        Self {
            channel: "DIC".to_string(),
            bounds: [-10.0, 10.0],
            z_step: 5.0,
            offset: 0.0,
        }
    }
}

/// What a task does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Acquire and persist one frame per channel.
    Imaging {
        /// Channels in acquisition order
        channels: Vec<String>,
    },
    /// Deliver one light pulse through the shutter.
    Induction {
        /// Shutter-open hold
        width: Duration,
        /// Channel routing the stimulation light
        channel: String,
    },
    /// Scan z and move to the sharpest plane.
    Autofocus(AutofocusParams),
}

impl TaskKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Imaging { .. } => "imaging",
            TaskKind::Induction { .. } => "induction",
            TaskKind::Autofocus(_) => "autofocus",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Imaging { channels } => write!(f, "imaging [{}]", channels.join(", ")),
            TaskKind::Induction { width, channel } => {
                write!(f, "induction {} for {:?}", channel, width)
            }
            TaskKind::Autofocus(p) => write!(
                f,
                "autofocus {} over [{}, {}) step {}",
                p.channel, p.bounds[0], p.bounds[1], p.z_step
            ),
        }
    }
}

/// A task kind plus its remaining due times, earliest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Action
    pub kind: TaskKind,
    due: VecDeque<f64>,
}

impl Task {
    /// Task with explicit due times. They are expected in increasing order.
    pub fn new(kind: TaskKind, due: VecDeque<f64>) -> Self {
        Self { kind, due }
    }

    /// Imaging task over one window.
    pub fn imaging(window: TimeWindow, channels: Vec<String>) -> Self {
        Self::new(TaskKind::Imaging { channels }, window.due_times())
    }

    /// Induction task over one window.
    pub fn induction(window: PulseWindow, channel: impl Into<String>) -> ScopeResult<Self> {
        Ok(Self::new(
            TaskKind::Induction {
                width: window.hold()?,
                channel: channel.into(),
            },
            window.timing().due_times(),
        ))
    }

    /// Autofocus task over one window.
    pub fn autofocus(window: TimeWindow, params: AutofocusParams) -> Self {
        Self::new(TaskKind::Autofocus(params), window.due_times())
    }

    /// Earliest remaining due time.
    pub fn next_due(&self) -> Option<f64> {
        self.due.front().copied()
    }

    /// Whether the earliest due time has been reached at `elapsed` seconds.
    pub fn is_due(&self, elapsed: f64) -> bool {
        self.next_due().is_some_and(|due| elapsed >= due)
    }

    /// Drop the earliest due time after it has been serviced.
    pub fn pop_due(&mut self) -> Option<f64> {
        self.due.pop_front()
    }

    /// Remaining due times.
    pub fn due_times(&self) -> &VecDeque<f64> {
        &self.due
    }

    /// Whether nothing is left to fire.
    pub fn is_exhausted(&self) -> bool {
        self.due.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn induction_window_expands_to_five_pulses() {
        let due = TimeWindow::new(60.0, 301.0, 60.0).due_times();
        assert_eq!(due, VecDeque::from(vec![60.0, 120.0, 180.0, 240.0, 300.0]));
    }

    #[test]
    fn due_times_are_spaced_increasing_and_below_stop() {
        for &(start, stop, period) in &[
            (0.0, 10.0, 1.0),
            (0.0, 1.0, 0.1),
            (5.0, 5.5, 0.25),
            (-3.0, 7.0, 2.5),
            (0.0, 3600.0, 7.0),
        ] {
            let due = arange(start, stop, period);
            assert!(!due.is_empty());
            assert_eq!(due[0], start);
            assert!(*due.last().unwrap() < stop);
            for pair in due.windows(2) {
                assert!(pair[1] > pair[0]);
                assert!((pair[1] - pair[0] - period).abs() < EPS);
            }
            // one more step would reach or pass stop
            assert!(due.last().unwrap() + period >= stop - EPS);
        }
    }

    #[test]
    fn count_follows_ceil_even_when_rounding_reaches_stop() {
        // (1.3 - 1.0) / 0.1 is slightly above 3.0
        let values = arange(1.0, 1.3, 0.1);
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 1.0);
        let last = values[3];
        assert!((last - 1.3).abs() < 1e-9);
        assert_eq!(last, 1.0 + 3.0 * 0.1);
    }

    #[test]
    fn empty_or_degenerate_windows_expand_to_nothing() {
        assert!(arange(10.0, 10.0, 1.0).is_empty());
        assert!(arange(10.0, 0.0, 1.0).is_empty());
        assert!(arange(0.0, 10.0, 0.0).is_empty());
        assert!(arange(0.0, 10.0, -1.0).is_empty());
        assert!(arange(0.0, f64::NAN, 1.0).is_empty());
    }

    #[test]
    fn pop_consumes_earliest_first() {
        let mut task = Task::imaging(TimeWindow::new(0.0, 3.0, 1.0), vec!["DIC".into()]);
        assert!(task.is_due(0.0));
        assert!(!task.is_due(-0.5));
        assert_eq!(task.pop_due(), Some(0.0));
        assert_eq!(task.next_due(), Some(1.0));
        assert!(!task.is_due(0.99));
        task.pop_due();
        task.pop_due();
        assert!(task.is_exhausted());
        assert!(!task.is_due(100.0));
    }

    #[test]
    fn induction_task_rejects_negative_width() {
        let err = Task::induction(PulseWindow::new(0.0, 10.0, 5.0, -1.0), "BL1").unwrap_err();
        assert!(matches!(err, ScopeError::Configuration(_)));

        let task = Task::induction(PulseWindow::new(0.0, 10.0, 5.0, 1.5), "BL1").unwrap();
        assert_eq!(
            task.kind,
            TaskKind::Induction {
                width: Duration::from_millis(1500),
                channel: "BL1".into()
            }
        );
        assert_eq!(task.due_times().len(), 2);
    }

    #[test]
    fn window_validation() {
        assert!(TimeWindow::new(0.0, 10.0, 1.0).validate("imaging").is_ok());
        assert!(TimeWindow::new(0.0, 0.0, 1.0).validate("imaging").is_ok());
        assert!(TimeWindow::new(10.0, 0.0, 1.0).validate("imaging").is_err());
        assert!(TimeWindow::new(0.0, 10.0, f64::INFINITY).validate("imaging").is_err());
        assert!(PulseWindow::new(0.0, 10.0, 1.0, 0.0).validate("induction").is_ok());
    }
}

//! Fault injection for the mock microscope.
//!
//! A [`FaultPlan`] is consulted before every state-changing command. Faults
//! surface as [`DriverError`]s so the experiment runtime sees exactly what a
//! failing device adapter would hand it.

use super::rng::MockRng;
use parking_lot::Mutex;
use scope_core::error::{DriverError, DriverErrorKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Commands a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Lateral stage move
    MoveXy,
    /// Focus move
    MoveZ,
    /// Channel preset change
    SetChannel,
    /// Exposure change
    SetExposure,
    /// Manual or automatic shutter control
    Shutter,
    /// Single acquisition
    Snap,
    /// Sensor ROI change
    Roi,
    /// Continuous acquisition start/stop
    Continuous,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::MoveXy => "move_xy",
            Operation::MoveZ => "move_z",
            Operation::SetChannel => "set_channel",
            Operation::SetExposure => "set_exposure",
            Operation::Shutter => "shutter",
            Operation::Snap => "snap",
            Operation::Roi => "roi",
            Operation::Continuous => "continuous",
        };
        f.write_str(name)
    }
}

/// A scripted device failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// `op` succeeds `successes` times, then fails on every later call
    FailAfter {
        /// Affected command
        op: Operation,
        /// Calls that go through before the first failure
        successes: u32,
    },
    /// Every call of the command times out
    Timeout(Operation),
    /// The link drops on the first command of any kind and stays down
    LinkLoss,
}

#[derive(Debug, Default)]
struct FaultState {
    calls: HashMap<Operation, u32>,
    link_down: bool,
}

/// Set of faults a mock device should exhibit.
///
/// Clones share counters, so a plan handed to a cloned device keeps counting
/// across both handles.
#[derive(Clone, Debug)]
pub struct FaultPlan {
    faults: Arc<Vec<Fault>>,
    flaky_rate: f64,
    rng: Arc<MockRng>,
    state: Arc<Mutex<FaultState>>,
}

impl FaultPlan {
    /// A healthy device.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// A device with a single scripted fault.
    pub fn with(fault: Fault) -> Self {
        Self::new(vec![fault])
    }

    /// A device with several scripted faults, checked in order.
    pub fn new(faults: Vec<Fault>) -> Self {
        Self {
            faults: Arc::new(faults),
            flaky_rate: 0.0,
            rng: Arc::new(MockRng::new(None)),
            state: Arc::new(Mutex::new(FaultState::default())),
        }
    }

    /// Additionally fail any command with probability `rate`.
    ///
    /// Pass a seed to make the failure sequence reproducible.
    pub fn flaky(mut self, rate: f64, seed: Option<u64>) -> Self {
        self.flaky_rate = rate;
        self.rng = Arc::new(MockRng::new(seed));
        self
    }

    /// Decide whether this call of `op` on `device` goes through.
    pub fn check(&self, device: &str, op: Operation) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.link_down {
            return Err(link_lost(device));
        }

        let count = state.calls.entry(op).or_insert(0);
        *count += 1;
        let count = *count;

        for fault in self.faults.iter() {
            match *fault {
                Fault::FailAfter { op: target, successes } if target == op && count > successes => {
                    return Err(DriverError::new(
                        device,
                        DriverErrorKind::Hardware,
                        format!("{} failed after {} successful calls", op, successes),
                    ));
                }
                Fault::Timeout(target) if target == op => {
                    return Err(DriverError::new(
                        device,
                        DriverErrorKind::Timeout,
                        format!("{} timed out", op),
                    ));
                }
                Fault::LinkLoss => {
                    state.link_down = true;
                    return Err(link_lost(device));
                }
                _ => {}
            }
        }

        if self.rng.should_fail(self.flaky_rate) {
            return Err(DriverError::new(
                device,
                DriverErrorKind::Hardware,
                format!("random {} failure", op),
            ));
        }
        Ok(())
    }

    /// Forget call counts and bring a dropped link back up.
    pub fn reset(&self) {
        *self.state.lock() = FaultState::default();
    }
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self::none()
    }
}

fn link_lost(device: &str) -> DriverError {
    DriverError::new(device, DriverErrorKind::Communication, "link to device lost")
}

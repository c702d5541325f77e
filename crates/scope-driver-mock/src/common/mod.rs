//! Shared simulation plumbing: timing model, fault injection and a seeded RNG.

pub mod faults;
pub mod mode;
pub mod rng;
pub mod timing;

pub use faults::{Fault, FaultPlan, Operation};
pub use mode::MockMode;
pub use rng::MockRng;
pub use timing::TimingConfig;

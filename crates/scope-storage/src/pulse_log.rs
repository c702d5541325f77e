//! Induction pulse timing log for one site.
//!
//! CSV with header `ta,tb`, one row per pulse: shutter-open and shutter-close
//! times in seconds since the experiment clock origin.

use anyhow::{Context, Result};
use std::path::Path;

/// Ordered `(ta, tb)` pulse pairs of one site. Append-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PulseLog {
    pulses: Vec<(f64, f64)>,
}

impl PulseLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pulse.
    pub fn push(&mut self, ta: f64, tb: f64) {
        self.pulses.push((ta, tb));
    }

    /// All pulses in firing order.
    pub fn pulses(&self) -> &[(f64, f64)] {
        &self.pulses
    }

    /// Number of pulses.
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    /// Whether no pulse was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Rewrite `path` with the full log.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to open pulse log {:?}", path))?;
        writer.write_record(["ta", "tb"])?;
        for (ta, tb) in &self.pulses {
            writer.write_record([ta.to_string(), tb.to_string()])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush pulse log {:?}", path))?;
        Ok(())
    }

    /// Load a log previously written by [`PulseLog::write_csv`].
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open pulse log {:?}", path))?;
        let mut log = Self::new();
        for record in reader.records() {
            let record = record?;
            let ta: f64 = record.get(0).unwrap_or_default().trim().parse()?;
            let tb: f64 = record.get(1).unwrap_or_default().trim().parse()?;
            log.push(ta, tb);
        }
        Ok(log)
    }
}

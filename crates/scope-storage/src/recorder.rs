//! Session recorder: the persistence side effects of running tasks.

use crate::layout::{ensure_dir, SessionLayout};
use crate::pulse_log::PulseLog;
use crate::tiff_writer::TiffWriter;
use anyhow::Result;
use scope_core::data::Frame;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes frames and pulse logs for one session.
///
/// Pulse logs are keyed by site id and kept in memory; every new pulse
/// rewrites that site's whole CSV.
#[derive(Debug)]
pub struct SessionRecorder {
    layout: SessionLayout,
    pulse_logs: BTreeMap<usize, PulseLog>,
}

impl SessionRecorder {
    /// Recorder writing under `layout`.
    pub fn new(layout: SessionLayout) -> Self {
        Self {
            layout,
            pulse_logs: BTreeMap::new(),
        }
    }

    /// Path scheme in use.
    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    /// Session root.
    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Create `{root}/{channel}/{site}` for every channel and every site id
    /// below `sites`.
    pub fn prepare_imaging_dirs(&self, channels: &[String], sites: usize) -> Result<()> {
        for channel in channels {
            for site in 0..sites {
                ensure_dir(&self.layout.site_dir(channel, site))?;
            }
        }
        Ok(())
    }

    /// Persist a time-lapse frame and return where it went.
    pub fn save_frame(
        &self,
        frame: &Frame,
        channel: &str,
        site: usize,
        elapsed_secs: f64,
    ) -> Result<PathBuf> {
        let path = self.layout.frame_path(channel, site, elapsed_secs);
        write_frame_creating_dirs(frame, &path)?;
        Ok(path)
    }

    /// Persist a frame at an arbitrary path inside the session.
    pub fn save_frame_at(&self, frame: &Frame, path: &Path) -> Result<()> {
        write_frame_creating_dirs(frame, path)
    }

    /// Append a pulse to `site`'s log and rewrite `{root}/u{site}.csv`.
    pub fn record_pulse(&mut self, site: usize, ta: f64, tb: f64) -> Result<PathBuf> {
        let log = self.pulse_logs.entry(site).or_default();
        log.push(ta, tb);
        let path = self.layout.pulse_log_path(site);
        log.write_csv(&path)?;
        debug!(site, ta, tb, pulses = log.len(), "Recorded induction pulse");
        Ok(path)
    }

    /// In-memory pulse log of `site`.
    pub fn pulse_log(&self, site: usize) -> Option<&PulseLog> {
        self.pulse_logs.get(&site)
    }
}

fn write_frame_creating_dirs(frame: &Frame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    TiffWriter::write_frame(frame, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prepares_one_dir_per_channel_and_site() {
        let tmp = TempDir::new().unwrap();
        let recorder = SessionRecorder::new(SessionLayout::new(tmp.path()));

        recorder
            .prepare_imaging_dirs(&["GFP".to_string(), "DIC".to_string()], 2)
            .unwrap();

        for channel in ["GFP", "DIC"] {
            for site in 0..2 {
                assert!(tmp.path().join(channel).join(site.to_string()).is_dir());
            }
        }
    }

    #[test]
    fn pulses_are_kept_per_site() {
        let tmp = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::new(SessionLayout::new(tmp.path()));

        recorder.record_pulse(0, 1.0, 2.0).unwrap();
        recorder.record_pulse(1, 1.5, 2.5).unwrap();
        recorder.record_pulse(0, 5.0, 6.0).unwrap();

        assert_eq!(recorder.pulse_log(0).unwrap().pulses(), &[(1.0, 2.0), (5.0, 6.0)]);
        assert_eq!(recorder.pulse_log(1).unwrap().len(), 1);
        assert!(recorder.pulse_log(2).is_none());

        let on_disk = PulseLog::read_csv(&tmp.path().join("u0.csv")).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    #[test]
    fn save_frame_creates_missing_dirs() {
        let tmp = TempDir::new().unwrap();
        let recorder = SessionRecorder::new(SessionLayout::new(tmp.path()));
        let frame = Frame::from_u8(4, 4, vec![7; 16]);

        let path = recorder.save_frame(&frame, "mCherry", 3, 12.0).unwrap();

        assert_eq!(path, tmp.path().join("mCherry/3/12.0.tiff"));
        assert!(path.is_file());
    }
}

//! On-disk layout of an experiment session.
//!
//! ```text
//! {root}/
//! ├── settings.txt                  archived configuration
//! ├── u{site}.csv                   induction pulse log per site
//! ├── {channel}/{site}/{t}.tiff     time-lapse frames, t = elapsed seconds (1 dp)
//! ├── {channel}/{i}_{j}.tiff        xy field tiles
//! └── {stamp}_zstack/{channel}/{z}.tiff
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Image file extension used for every frame.
pub const FRAME_EXTENSION: &str = "tiff";

/// Path scheme rooted at one session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    root: PathBuf,
}

impl SessionLayout {
    /// Layout rooted at `root`. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Session root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one site's frames for one channel.
    pub fn site_dir(&self, channel: &str, site: usize) -> PathBuf {
        self.root.join(channel).join(site.to_string())
    }

    /// Path of a time-lapse frame, keyed by elapsed seconds rounded to 0.1 s.
    pub fn frame_path(&self, channel: &str, site: usize, elapsed_secs: f64) -> PathBuf {
        self.site_dir(channel, site)
            .join(format!("{:.1}.{}", elapsed_secs, FRAME_EXTENSION))
    }

    /// Path of a site's pulse log.
    pub fn pulse_log_path(&self, site: usize) -> PathBuf {
        self.root.join(format!("u{}.csv", site))
    }

    /// Directory of a z-stack taken at `stamp`.
    pub fn zstack_dir(&self, stamp: &str) -> PathBuf {
        self.root.join(format!("{}_zstack", stamp))
    }

    /// Path of one z-stack slice.
    pub fn zstack_path(&self, stamp: &str, channel: &str, z: f64) -> PathBuf {
        self.zstack_dir(stamp)
            .join(channel)
            .join(format!("{:?}.{}", z, FRAME_EXTENSION))
    }

    /// Path of one xy-field tile at grid row `i`, column `j`.
    pub fn xyfield_path(&self, channel: &str, i: usize, j: usize) -> PathBuf {
        self.root
            .join(channel)
            .join(format!("{}_{}.{}", i, j, FRAME_EXTENSION))
    }

    /// Create the session root.
    pub fn create_root(&self) -> Result<()> {
        ensure_dir(&self.root)
    }

    /// Copy `source` into the session root under `name`.
    pub fn archive_file(&self, source: &Path, name: &str) -> Result<PathBuf> {
        let target = self.root.join(name);
        fs::copy(source, &target).with_context(|| {
            format!("Failed to archive {:?} to {:?}", source, target)
        })?;
        Ok(target)
    }
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))
}

/// Replace every character outside `[A-Za-z0-9-_.]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{base}/{YYYYMMDD}_{sanitized name}`.
pub fn experiment_dir(base: &Path, date: NaiveDate, name: &str) -> PathBuf {
    base.join(format!("{}_{}", date.format("%Y%m%d"), sanitize_name(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn frame_path_uses_one_decimal() {
        let layout = SessionLayout::new("/data/run");
        assert_eq!(
            layout.frame_path("mCherry", 2, 60.04),
            PathBuf::from("/data/run/mCherry/2/60.0.tiff")
        );
        assert_eq!(
            layout.frame_path("GFP", 0, 5.26),
            PathBuf::from("/data/run/GFP/0/5.3.tiff")
        );
    }

    #[test]
    fn pulse_log_and_snapshot_paths() {
        let layout = SessionLayout::new("/data/run");
        assert_eq!(layout.pulse_log_path(3), PathBuf::from("/data/run/u3.csv"));
        assert_eq!(
            layout.zstack_path("20240101-120000", "DIC", -10.0),
            PathBuf::from("/data/run/20240101-120000_zstack/DIC/-10.0.tiff")
        );
        assert_eq!(
            layout.xyfield_path("DIC", 1, 2),
            PathBuf::from("/data/run/DIC/1_2.tiff")
        );
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_name("opto run #3/a"), "opto_run__3_a");
        assert_eq!(sanitize_name("keep-this_name.v2"), "keep-this_name.v2");
    }

    #[test]
    fn experiment_dir_is_date_prefixed() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            experiment_dir(Path::new("expts"), date, "light pulse"),
            PathBuf::from("expts/20240309_light_pulse")
        );
    }

    #[test]
    fn archive_copies_into_root() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("scope.toml");
        fs::write(&source, "topology = \"single\"\n").unwrap();

        let layout = SessionLayout::new(tmp.path().join("session"));
        layout.create_root().unwrap();
        let archived = layout.archive_file(&source, "settings.txt").unwrap();

        assert_eq!(
            fs::read_to_string(archived).unwrap(),
            "topology = \"single\"\n"
        );
    }
}

//! Position registry
//!
//! Ordered list of stage sites. The index of a coordinate is its site id, the
//! key for per-site state such as pulse logs and image directories. New
//! coordinates are inserted at the front, so the most recently recorded site
//! is always site 0.
//!
//! Every move goes through the travel check: the target must lie strictly
//! inside `origin + [lower, upper]` on each axis it touches. A target outside
//! that window is dropped with a warning and never reaches the stage. Callers
//! cannot tell a dropped move apart from a move that succeeded.

use crate::config::StageConfig;
use scope_core::capabilities::{FocusDrive, XyStage};
use scope_core::error::{ScopeError, ScopeResult};
use scope_core::geometry::{Axis, Coordinate};
use scope_core::limits::TravelWindow;
use tracing::{debug, warn};

/// Value of one addressable axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisPosition {
    /// Lateral `(x, y)`
    Xy(f64, f64),
    /// Focus
    Z(f64),
}

/// Registered sites plus the travel windows derived from the origin.
#[derive(Debug, Clone)]
pub struct PositionRegistry {
    origin: Coordinate,
    sites: Vec<Coordinate>,
    x_window: TravelWindow,
    y_window: TravelWindow,
    z_window: TravelWindow,
}

impl PositionRegistry {
    /// Read the live stage position as origin and single default site.
    pub async fn new<H>(hw: &H, stage: &StageConfig) -> ScopeResult<Self>
    where
        H: XyStage + FocusDrive + ?Sized,
    {
        let (x, y) = hw.xy_position().await?;
        let z = hw.z_position().await?;
        let registry = Self::with_origin(Coordinate::new(x, y, z), stage);
        debug!(origin = %registry.origin, "Position registry initialised");
        Ok(registry)
    }

    /// Registry around a known origin, without touching hardware.
    pub fn with_origin(origin: Coordinate, stage: &StageConfig) -> Self {
        Self {
            origin,
            sites: vec![origin],
            x_window: TravelWindow::around(origin.x, stage.x_limit),
            y_window: TravelWindow::around(origin.y, stage.y_limit),
            z_window: TravelWindow::around(origin.z, stage.z_limit),
        }
    }

    /// Position the travel windows are anchored to.
    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether every site has been discarded.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Coordinate of `site`.
    pub fn get(&self, site: usize) -> Option<Coordinate> {
        self.sites.get(site).copied()
    }

    /// Sites in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.sites.iter()
    }

    /// Travel window for x, y and z.
    pub fn windows(&self) -> (TravelWindow, TravelWindow, TravelWindow) {
        (self.x_window, self.y_window, self.z_window)
    }

    /// Overwrite the stored z of `site`.
    pub fn set_z(&mut self, site: usize, z: f64) -> ScopeResult<()> {
        let len = self.sites.len();
        let coord = self
            .sites
            .get_mut(site)
            .ok_or(ScopeError::SiteOutOfRange { site, len })?;
        coord.z = z;
        Ok(())
    }

    /// Record the live stage position as the new site 0.
    ///
    /// No travel check: the stage is already there.
    pub async fn record_current<H>(&mut self, hw: &H) -> ScopeResult<Coordinate>
    where
        H: XyStage + FocusDrive + ?Sized,
    {
        let (x, y) = hw.xy_position().await?;
        let z = hw.z_position().await?;
        let coord = Coordinate::new(x, y, z);
        self.sites.insert(0, coord);
        debug!(%coord, sites = self.sites.len(), "Recorded site");
        Ok(coord)
    }

    /// Drop site 0. Does nothing on an empty registry.
    pub fn discard_most_recent(&mut self) -> Option<Coordinate> {
        if self.sites.is_empty() {
            return None;
        }
        let coord = self.sites.remove(0);
        debug!(%coord, sites = self.sites.len(), "Discarded site");
        Some(coord)
    }

    /// Move one axis of the stage to the stored value of `site`.
    pub async fn move_to<H>(&self, hw: &H, site: usize, axis: Axis) -> ScopeResult<()>
    where
        H: XyStage + FocusDrive + ?Sized,
    {
        let coord = self.get(site).ok_or(ScopeError::SiteOutOfRange {
            site,
            len: self.sites.len(),
        })?;
        match axis {
            Axis::Xy => self.move_xy(hw, coord.x, coord.y).await,
            Axis::Z => self.move_z(hw, coord.z).await,
        }
    }

    /// Travel-checked lateral move. Targets are rounded to whole stage units.
    pub async fn move_xy<H>(&self, hw: &H, x: f64, y: f64) -> ScopeResult<()>
    where
        H: XyStage + ?Sized,
    {
        if !(self.x_window.contains(x) && self.y_window.contains(y)) {
            warn!(
                x,
                y,
                x_window = ?(self.x_window.min, self.x_window.max),
                y_window = ?(self.y_window.min, self.y_window.max),
                "XY move outside travel window suppressed"
            );
            return Ok(());
        }
        hw.set_xy_position(x.round_ties_even(), y.round_ties_even())
            .await
    }

    /// Travel-checked focus move.
    pub async fn move_z<H>(&self, hw: &H, z: f64) -> ScopeResult<()>
    where
        H: FocusDrive + ?Sized,
    {
        if !self.z_window.contains(z) {
            warn!(
                z,
                z_window = ?(self.z_window.min, self.z_window.max),
                "Z move outside travel window suppressed"
            );
            return Ok(());
        }
        hw.set_z_position(z).await
    }

    /// Read an axis by name (`"xy"` or `"z"`, any case).
    pub async fn position<H>(&self, hw: &H, axis: &str) -> ScopeResult<AxisPosition>
    where
        H: XyStage + FocusDrive + ?Sized,
    {
        match axis.parse::<Axis>()? {
            Axis::Xy => {
                let (x, y) = hw.xy_position().await?;
                Ok(AxisPosition::Xy(x, y))
            }
            Axis::Z => Ok(AxisPosition::Z(hw.z_position().await?)),
        }
    }

    /// Travel-checked move of an axis given by name.
    ///
    /// Fails with [`ScopeError::InvalidAxis`] for an unknown name and with
    /// [`ScopeError::Configuration`] when `value` does not fit the axis.
    pub async fn set_position<H>(&self, hw: &H, axis: &str, value: AxisPosition) -> ScopeResult<()>
    where
        H: XyStage + FocusDrive + ?Sized,
    {
        match (axis.parse::<Axis>()?, value) {
            (Axis::Xy, AxisPosition::Xy(x, y)) => self.move_xy(hw, x, y).await,
            (Axis::Z, AxisPosition::Z(z)) => self.move_z(hw, z).await,
            (axis, value) => Err(ScopeError::Configuration(format!(
                "value {:?} does not fit axis '{}'",
                value, axis
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_driver_mock::{HardwareCall, MockMicroscope};
    use tracing_test::traced_test;

    fn stage() -> StageConfig {
        StageConfig {
            x_limit: [-100.0, 100.0],
            y_limit: [-100.0, 100.0],
            z_limit: [-20.0, 20.0],
        }
    }

    #[tokio::test]
    async fn origin_is_the_default_site() {
        let hw = MockMicroscope::builder().position(10.0, 20.0, 5.0).build();
        let registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0), Some(Coordinate::new(10.0, 20.0, 5.0)));
        assert_eq!(registry.origin(), Coordinate::new(10.0, 20.0, 5.0));
        assert_eq!(registry.windows().2, TravelWindow::around(5.0, [-20.0, 20.0]));
    }

    #[tokio::test]
    async fn newest_site_comes_first() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        hw.set_xy_position(1.0, 1.0).await.unwrap();
        registry.record_current(&hw).await.unwrap();
        hw.set_xy_position(2.0, 2.0).await.unwrap();
        registry.record_current(&hw).await.unwrap();

        let xs: Vec<f64> = registry.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![2.0, 1.0, 0.0]);

        assert_eq!(registry.discard_most_recent().map(|c| c.x), Some(2.0));
        assert_eq!(registry.get(0).map(|c| c.x), Some(1.0));
    }

    #[tokio::test]
    async fn discard_on_empty_registry_is_a_no_op() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        assert!(registry.discard_most_recent().is_some());
        assert!(registry.is_empty());
        assert!(registry.discard_most_recent().is_none());
        assert!(registry.discard_most_recent().is_none());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn record_current_skips_travel_check() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        hw.set_xy_position(5000.0, 0.0).await.unwrap();
        let coord = registry.record_current(&hw).await.unwrap();
        assert_eq!(coord.x, 5000.0);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn out_of_window_moves_never_reach_the_stage() {
        let hw = MockMicroscope::new();
        let registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        registry.move_xy(&hw, 100.0, 0.0).await.unwrap();
        registry.move_xy(&hw, 0.0, -250.0).await.unwrap();
        registry.move_z(&hw, 20.0).await.unwrap();
        registry.move_z(&hw, -35.0).await.unwrap();

        assert!(hw.calls().await.is_empty());
        assert!(logs_contain("XY move outside travel window suppressed"));
        assert!(logs_contain("Z move outside travel window suppressed"));
    }

    #[tokio::test]
    async fn in_window_moves_are_forwarded_and_rounded() {
        let hw = MockMicroscope::new();
        let registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        registry.move_xy(&hw, 12.6, -3.2).await.unwrap();
        registry.move_z(&hw, 19.99).await.unwrap();

        assert_eq!(
            hw.calls().await,
            vec![
                HardwareCall::SetXy { x: 13.0, y: -3.0 },
                HardwareCall::SetZ(19.99)
            ]
        );
    }

    #[tokio::test]
    async fn move_to_uses_stored_site_values() {
        let hw = MockMicroscope::new();
        let mut registry = PositionRegistry::new(&hw, &stage()).await.unwrap();
        registry.set_z(0, 7.5).unwrap();

        registry.move_to(&hw, 0, Axis::Z).await.unwrap();
        registry.move_to(&hw, 0, Axis::Xy).await.unwrap();

        assert_eq!(
            hw.calls().await,
            vec![HardwareCall::SetZ(7.5), HardwareCall::SetXy { x: 0.0, y: 0.0 }]
        );
        assert!(matches!(
            registry.move_to(&hw, 3, Axis::Xy).await,
            Err(ScopeError::SiteOutOfRange { site: 3, len: 1 })
        ));
    }

    #[tokio::test]
    async fn axis_names_are_validated() {
        let hw = MockMicroscope::builder().position(1.0, 2.0, 3.0).build();
        let registry = PositionRegistry::new(&hw, &stage()).await.unwrap();

        assert_eq!(
            registry.position(&hw, "XY").await.unwrap(),
            AxisPosition::Xy(1.0, 2.0)
        );
        assert_eq!(registry.position(&hw, "z").await.unwrap(), AxisPosition::Z(3.0));
        assert!(matches!(
            registry.position(&hw, "theta").await,
            Err(ScopeError::InvalidAxis(_))
        ));
        assert!(matches!(
            registry
                .set_position(&hw, "w", AxisPosition::Z(0.0))
                .await,
            Err(ScopeError::InvalidAxis(_))
        ));
        assert!(matches!(
            registry
                .set_position(&hw, "z", AxisPosition::Xy(0.0, 0.0))
                .await,
            Err(ScopeError::Configuration(_))
        ));

        registry
            .set_position(&hw, "z", AxisPosition::Z(4.0))
            .await
            .unwrap();
        assert_eq!(hw.calls().await, vec![HardwareCall::SetZ(4.0)]);
    }
}

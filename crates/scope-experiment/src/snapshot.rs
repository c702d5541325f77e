//! One-shot acquisitions outside the scheduler: z-stacks and tiled xy fields.
//!
//! Both acquire every frame first and write them out afterwards, then return
//! the stage to where it started. Stage moves go through the registry's
//! travel check like any scheduled move.

use crate::registry::PositionRegistry;
use crate::task::arange;
use scope_core::capabilities::{snap_image, ChannelControl, FocusDrive, Microscope, XyStage};
use scope_core::data::Frame;
use scope_core::error::{ScopeError, ScopeResult};
use scope_storage::SessionRecorder;
use std::path::PathBuf;
use tracing::info;

/// Timestamp used to name z-stack directories, e.g. `20240309-141502`.
pub fn stack_stamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Focus offsets of a z-stack of total `depth` centred on `z0`.
pub fn zstack_planes(z0: f64, depth: f64, step: f64) -> Vec<f64> {
    arange(z0 - depth / 2.0, z0 + depth / 2.0, step)
}

/// Tile offsets of an `n`-wide xy field: `-(n/2)*step ..= (n/2)*step`.
pub fn xyfield_offsets(n: usize, step: f64) -> Vec<f64> {
    let half = (n / 2) as f64 * step;
    arange(-half, half + step, step)
}

/// Acquire a z-stack per channel around the current focus.
///
/// Frames land in `{root}/{stamp}_zstack/{channel}/{z}.tiff`.
pub async fn snap_zstack<H>(
    hw: &H,
    registry: &PositionRegistry,
    recorder: &SessionRecorder,
    channels: &[String],
    depth: f64,
    step: f64,
    stamp: &str,
) -> ScopeResult<Vec<PathBuf>>
where
    H: Microscope + ?Sized,
{
    let z0 = hw.z_position().await?;
    let planes = zstack_planes(z0, depth, step);

    let mut frames: Vec<(f64, &str, Frame)> = Vec::with_capacity(planes.len() * channels.len());
    for channel in channels {
        hw.set_channel(channel).await?;
        for &z in &planes {
            registry.move_z(hw, z).await?;
            frames.push((z, channel.as_str(), snap_image(hw).await?));
        }
    }

    let mut paths = Vec::with_capacity(frames.len());
    for (z, channel, frame) in &frames {
        let path = recorder.layout().zstack_path(stamp, channel, *z);
        recorder
            .save_frame_at(frame, &path)
            .map_err(ScopeError::Storage)?;
        paths.push(path);
    }

    registry.move_z(hw, z0).await?;
    info!(planes = planes.len(), channels = channels.len(), "Z-stack saved");
    Ok(paths)
}

/// Acquire an `n` x `n` tiled field around the current xy position.
///
/// Rows are walked in a serpentine: even rows run with mirrored x offsets so
/// consecutive tiles stay adjacent. Tile `(i, j)` of each channel lands in
/// `{root}/{channel}/{i}_{j}.tiff`.
pub async fn snap_xyfield<H>(
    hw: &H,
    registry: &PositionRegistry,
    recorder: &SessionRecorder,
    channels: &[String],
    n: usize,
    step: f64,
) -> ScopeResult<Vec<PathBuf>>
where
    H: Microscope + ?Sized,
{
    let (x0, y0) = hw.xy_position().await?;
    let grid = xyfield_offsets(n, step);

    let mut tiles: Vec<(usize, usize, &str, Frame)> =
        Vec::with_capacity(grid.len() * grid.len() * channels.len());
    for (i, &yi) in grid.iter().enumerate() {
        for (j, &xi) in grid.iter().enumerate() {
            let xi = if i % 2 == 0 { -xi } else { xi };
            registry.move_xy(hw, x0 + xi, y0 + yi).await?;
            for channel in channels {
                hw.set_channel(channel).await?;
                tiles.push((i, j, channel.as_str(), snap_image(hw).await?));
            }
        }
    }

    let mut paths = Vec::with_capacity(tiles.len());
    for (i, j, channel, frame) in &tiles {
        let path = recorder.layout().xyfield_path(channel, *i, *j);
        recorder
            .save_frame_at(frame, &path)
            .map_err(ScopeError::Storage)?;
        paths.push(path);
    }

    registry.move_xy(hw, x0, y0).await?;
    info!(tiles = grid.len() * grid.len(), channels = channels.len(), "XY field saved");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstack_planes_are_centred_and_exclude_the_top() {
        assert_eq!(zstack_planes(100.0, 20.0, 5.0), vec![90.0, 95.0, 100.0, 105.0]);
    }

    #[test]
    fn xyfield_grid_is_symmetric() {
        assert_eq!(xyfield_offsets(3, 132.0), vec![-132.0, 0.0, 132.0]);
        assert_eq!(xyfield_offsets(4, 10.0), vec![-20.0, -10.0, 0.0, 10.0, 20.0]);
        assert_eq!(xyfield_offsets(1, 10.0), vec![0.0]);
    }
}

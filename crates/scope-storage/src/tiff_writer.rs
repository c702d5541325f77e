//! TIFF export for camera frames.
//!
//! Preserves bit depth: 8-bit frames are written as `L8`, anything deeper as
//! `L16`.
//!
//! ```rust,ignore
//! use scope_storage::tiff_writer::TiffWriter;
//!
//! TiffWriter::write_frame(&frame, "GFP/0/60.0.tiff")?;
//! ```

use anyhow::{anyhow, Context, Result};
use image::codecs::tiff::TiffEncoder;
use image::ExtendedColorType;
use scope_core::data::Frame;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// TIFF export functionality for camera frames.
pub struct TiffWriter;

impl TiffWriter {
    /// Write a single frame to a TIFF file.
    ///
    /// The file is created or overwritten. Fails if the frame buffer does not
    /// match its dimensions or if encoding fails.
    pub fn write_frame<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<()> {
        let path = path.as_ref();

        let expected_bytes = frame.expected_len();
        if frame.data.len() != expected_bytes {
            return Err(anyhow!(
                "Frame data size mismatch: expected {} bytes for {}x{} {}bit, got {} bytes",
                expected_bytes,
                frame.width,
                frame.height,
                frame.bit_depth,
                frame.data.len()
            ));
        }

        let color = if frame.bytes_per_pixel() == 2 {
            ExtendedColorType::L16
        } else {
            ExtendedColorType::L8
        };

        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let encoder = TiffEncoder::new(BufWriter::new(file));
        encoder
            .encode(&frame.data, frame.width, frame.height, color)
            .with_context(|| format!("Failed to encode TIFF to {:?}", path))?;

        tracing::debug!(
            path = ?path,
            dimensions = format!("{}x{}", frame.width, frame.height),
            bit_depth = frame.bit_depth,
            "Wrote TIFF"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gradient_frame(width: u32, height: u32, bit_depth: u32) -> Frame {
        let n = width * height;
        if bit_depth == 16 {
            let pixels: Vec<u16> = (0..n)
                .map(|i| ((i as f32 / n as f32) * 65535.0) as u16)
                .collect();
            Frame::from_u16(width, height, &pixels)
        } else {
            let pixels: Vec<u8> = (0..n).map(|i| ((i as f32 / n as f32) * 255.0) as u8).collect();
            Frame::from_u8(width, height, pixels)
        }
    }

    #[test]
    fn test_write_8bit_frame() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test_8bit.tiff");

        TiffWriter::write_frame(&gradient_frame(64, 32, 8), &path).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 64 * 32);
    }

    #[test]
    fn test_write_16bit_frame() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test_16bit.tiff");

        TiffWriter::write_frame(&gradient_frame(64, 64, 16), &path).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 64 * 64 * 2);
    }

    #[test]
    fn test_data_size_mismatch_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.tiff");

        let mut frame = gradient_frame(32, 32, 16);
        frame.data.truncate(100);

        let result = TiffWriter::write_frame(&frame, &path);
        assert!(result.unwrap_err().to_string().contains("mismatch"));
        assert!(!path.exists());
    }
}

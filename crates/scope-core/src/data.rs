/// A single grayscale camera frame.
///
/// # Storage
/// Data is stored as a raw byte vector (`Vec<u8>`).
/// - 8-bit images: 1 byte per pixel.
/// - 12/16-bit images: 2 bytes per pixel, Little Endian.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Bits per pixel (e.g., 8, 12, 16)
    pub bit_depth: u32,

    /// Raw pixel data
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a new frame from 16-bit pixel data.
    pub fn from_u16(width: u32, height: u32, pixels: &[u16]) -> Self {
        let mut data = Vec::with_capacity(pixels.len() * 2);
        for pixel in pixels {
            data.extend_from_slice(&pixel.to_le_bytes());
        }

        Self {
            width,
            height,
            bit_depth: 16,
            data,
        }
    }

    /// Create a new frame from 8-bit pixel data.
    pub fn from_u8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            bit_depth: 8,
            data,
        }
    }

    /// Number of bytes each pixel occupies for this bit depth.
    pub fn bytes_per_pixel(&self) -> usize {
        if self.bit_depth > 8 {
            2
        } else {
            1
        }
    }

    /// Buffer length implied by the dimensions and bit depth.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * self.bytes_per_pixel()
    }

    /// Get pixel value at (x, y) as u32 (handling bit depth conversion).
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let idx = (y * self.width + x) as usize;

        match self.bytes_per_pixel() {
            1 => self.data.get(idx).map(|&v| v as u32),
            _ => {
                let start = idx * 2;
                match (self.data.get(start), self.data.get(start + 1)) {
                    (Some(&lo), Some(&hi)) => Some(u16::from_le_bytes([lo, hi]) as u32),
                    _ => None,
                }
            }
        }
    }

    /// Decode every pixel to `f64`, row-major.
    pub fn to_f64_pixels(&self) -> Vec<f64> {
        match self.bytes_per_pixel() {
            1 => self.data.iter().map(|&v| v as f64).collect(),
            _ => self
                .data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f64)
                .collect(),
        }
    }

    /// Calculate mean pixel value.
    pub fn mean(&self) -> f64 {
        let pixels = self.to_f64_pixels();
        if pixels.is_empty() {
            return 0.0;
        }
        pixels.iter().sum::<f64>() / pixels.len() as f64
    }
}

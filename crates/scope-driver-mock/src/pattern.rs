//! Synthetic specimen images for the mock camera.

/// Simple pseudo-random number generator (LCG) for reproducible noise.
/// Uses the same algorithm as glibc for predictable cross-platform behavior.
#[inline]
fn prng(seed: u64) -> u64 {
    seed.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fffffff
}

/// Relative sharpness in `(0, 1]` of a specimen sitting at `focal_plane`
/// when the objective is at `z`.
///
/// Lorentzian falloff with half-width `depth_of_field`.
pub fn sharpness(z: f64, focal_plane: f64, depth_of_field: f64) -> f64 {
    let depth = depth_of_field.abs().max(f64::EPSILON);
    let defocus = (z - focal_plane) / depth;
    1.0 / (1.0 + defocus * defocus)
}

/// Generates a checkerboard "specimen" whose contrast scales with `sharpness`.
///
/// Out of focus the cells fade towards the mean gray level, which lowers the
/// Laplacian variance of the frame. A faint per-pixel noise floor keyed on
/// `frame_num` keeps consecutive frames distinct.
///
/// # Returns
/// A Vec<u16> of `width * height` pixels, row-major
pub fn generate_focus_pattern(width: u32, height: u32, sharpness: f64, frame_num: u64) -> Vec<u16> {
    let w = width as usize;
    let h = height as usize;
    let mut buffer = vec![0u16; w * h];

    let cell = (width.min(height) / 16).max(2) as usize;
    let base = 30000.0;
    let amplitude = 20000.0 * sharpness.clamp(0.0, 1.0);
    let frame_seed = frame_num.wrapping_mul(2654435761);

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let sign = if ((x / cell) + (y / cell)) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            let noise = (prng(frame_seed ^ idx as u64) & 0x1F) as f64 - 16.0;
            buffer[idx] = (base + sign * amplitude + noise).clamp(0.0, 65535.0) as u16;
        }
    }

    buffer
}

//! Focus scoring.
//!
//! Sharpness is the variance of the image Laplacian: in-focus frames carry
//! more high-frequency content and therefore a wider spread of second
//! derivatives.

use scope_core::data::Frame;

/// Variance of the 3x3 Laplacian `[[0,-1,0],[-1,4,-1],[0,-1,0]]`.
///
/// Borders are handled by mirroring about the edge pixel (`d c b a | a b c d`),
/// so a uniform frame scores exactly 0. Empty frames score 0.
pub fn laplacian_variance(frame: &Frame) -> f64 {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let pixels = frame.to_f64_pixels();
    if w == 0 || h == 0 || pixels.len() < w * h {
        return 0.0;
    }

    let at = |x: usize, y: usize| pixels[y * w + x];
    let n = (w * h) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for y in 0..h {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(h - 1);
        for x in 0..w {
            let left = x.saturating_sub(1);
            let right = (x + 1).min(w - 1);
            let lap = 4.0 * at(x, y) - at(left, y) - at(right, y) - at(x, up) - at(x, down);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Running best-focus tracker for a z scan.
///
/// Starts at the scan's origin with score 0. A sample replaces the best only
/// when it scores strictly higher, so ties keep the earliest z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusSearch {
    best_z: f64,
    best_score: f64,
}

impl FocusSearch {
    /// Tracker whose fallback is `origin_z`.
    pub fn new(origin_z: f64) -> Self {
        Self {
            best_z: origin_z,
            best_score: 0.0,
        }
    }

    /// Offer a sample; returns whether it became the new best.
    pub fn observe(&mut self, z: f64, score: f64) -> bool {
        if score > self.best_score {
            self.best_score = score;
            self.best_z = z;
            true
        } else {
            false
        }
    }

    /// Best z so far.
    pub fn best_z(&self) -> f64 {
        self.best_z
    }

    /// Score of [`FocusSearch::best_z`].
    pub fn best_score(&self) -> f64 {
        self.best_score
    }
}

/// Best z over `(z, score)` samples, or `fallback_z` when no sample beats 0.
pub fn select_best_focus<I>(samples: I, fallback_z: f64) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut search = FocusSearch::new(fallback_z);
    for (z, score) in samples {
        search.observe(z, score);
    }
    search.best_z()
}

//! Reductions over valid pixels.

use serde::{Deserialize, Serialize};

use crate::types::Raster;

/// Summary of the valid (non-NaN) pixels of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterStats {
    pub mean: f64,
    pub min: f32,
    pub max: f32,
    pub valid_pixels: usize,
}

/// Mean, min and max over valid pixels; `None` when every pixel is masked.
///
/// Accumulates in f64 so large clips of Float32 values keep their precision.
pub fn summarize(raster: &Raster) -> Option<RasterStats> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;

    for &v in raster.data.iter().filter(|v| !v.is_nan()) {
        sum += v as f64;
        count += 1;
        min = min.min(v);
        max = max.max(v);
    }

    (count > 0).then(|| RasterStats {
        mean: sum / count as f64,
        min,
        max,
        valid_pixels: count,
    })
}

//! Downsampled density surfaces for visualization.

use serde::{Deserialize, Serialize};

use crate::grid::{DensityGrid, index_to_f64};

/// Pixel-count targets driving the downsample stride.
const TARGET_LARGE: usize = 10_000;
const TARGET_MEDIUM: usize = 5_000;
const TARGET_SMALL: usize = 2_500;

/// Value range of a density window, over all valid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceRange {
    /// Smallest valid density.
    pub min: f64,
    /// Largest valid density.
    pub max: f64,
    /// Mean of the valid densities.
    pub mean: f64,
    /// `log1p` of the smallest valid density, matching the point encoding.
    pub log_min: f64,
    /// `log1p` of the largest valid density.
    pub log_max: f64,
}

/// A strided point cloud over one raster window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensitySurface {
    /// Dataset name.
    pub name: String,
    /// Dataset reference year.
    pub year: i32,
    /// (latitude, longitude, `log1p`(density)) triples, row-major over the
    /// strided grid with nodata cells skipped.
    pub points: Vec<[f64; 3]>,
    /// Range over every valid pixel of the window (not only the strided
    /// ones); `None` when the window holds no valid data.
    pub range: Option<SurfaceRange>,
    /// Stride applied to both axes.
    pub downsample_factor: usize,
    /// Number of emitted points.
    pub point_count: usize,
}

/// Stride for a window of `total_pixels`: larger windows are downsampled
/// more aggressively, aiming at roughly 10 000 retained cells above one
/// million pixels, 5 000 above 250 000 and 2 500 below that.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn stride_for(total_pixels: usize) -> usize {
    let target = if total_pixels > 1_000_000 {
        TARGET_LARGE
    } else if total_pixels > 250_000 {
        TARGET_MEDIUM
    } else {
        TARGET_SMALL
    };
    let stride = (total_pixels as f64 / target as f64).sqrt() as usize;
    stride.max(1)
}

/// Builds the visualization surface for a window.
#[must_use]
pub fn density_surface(grid: &DensityGrid, name: &str, year: i32) -> DensitySurface {
    let stride = stride_for(grid.total_pixels());

    let mut points = Vec::new();
    for row in (0..grid.height()).step_by(stride) {
        for col in (0..grid.width()).step_by(stride) {
            let value = grid.value(col, row);
            if grid.is_valid_value(value) {
                let (lon, lat) = grid
                    .transform()
                    .corner(index_to_f64(col), index_to_f64(row));
                points.push([lat, lon, value.ln_1p()]);
            }
        }
    }

    let mut range = None;
    let mut count = 0_usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in grid.valid_values() {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    if count > 0 {
        range = Some(SurfaceRange {
            min,
            max,
            mean: sum / index_to_f64(count),
            log_min: min.ln_1p(),
            log_max: max.ln_1p(),
        });
    }

    DensitySurface {
        name: name.to_string(),
        year,
        point_count: points.len(),
        points,
        range,
        downsample_factor: stride,
    }
}

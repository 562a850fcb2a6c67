//! Zonal statistics over polygon footprints.

use geo::{BoundingRect, Intersects, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::grid::{DensityGrid, index_to_f64};

/// Summary statistics of the raster values inside a polygon footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonalStatistics {
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// Mean of the valid values.
    pub mean: f64,
    /// Median (same as `p50`).
    pub median: f64,
    /// 25th percentile.
    pub p25: f64,
    /// 50th percentile.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 90th percentile.
    pub p90: f64,
    /// Number of contributing pixels.
    pub count: usize,
}

/// Computes statistics of the grid restricted to `zone`.
///
/// Masking is all-touched: a pixel contributes when the zone intersects its
/// cell rectangle at all, not only when the cell center is inside. This
/// avoids undercounting service areas smaller than a few pixels. Returns
/// `None` when no valid pixel is touched, which is an explicit no-data
/// outcome distinct from a zone of legitimate zeros.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn zonal_stats(grid: &DensityGrid, zone: &MultiPolygon<f64>) -> Option<ZonalStatistics> {
    if grid.is_empty() {
        return None;
    }
    let rect = zone.bounding_rect()?;
    let transform = grid.transform();

    let cols = [
        transform.col_of_x(rect.min().x),
        transform.col_of_x(rect.max().x),
    ];
    let rows = [
        transform.row_of_y(rect.min().y),
        transform.row_of_y(rect.max().y),
    ];
    let col0 = cols[0].min(cols[1]).floor().max(0.0) as usize;
    let col1 = (cols[0].max(cols[1]).ceil().min(index_to_f64(grid.width()))) as usize;
    let row0 = rows[0].min(rows[1]).floor().max(0.0) as usize;
    let row1 = (rows[0].max(rows[1]).ceil().min(index_to_f64(grid.height()))) as usize;

    let mut values = Vec::new();
    for row in row0..row1 {
        for col in col0..col1 {
            let value = grid.value(col, row);
            if !grid.is_valid_value(value) {
                continue;
            }
            let cell = transform
                .cell_rect(index_to_f64(col), index_to_f64(row))
                .to_polygon();
            if zone.intersects(&cell) {
                values.push(value);
            }
        }
    }
    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);
    let count = values.len();
    let sum: f64 = values.iter().sum();
    let p50 = percentile(&values, 50.0);

    Some(ZonalStatistics {
        min: values[0],
        max: values[count - 1],
        mean: sum / index_to_f64(count),
        median: p50,
        p25: percentile(&values, 25.0),
        p50,
        p75: percentile(&values, 75.0),
        p90: percentile(&values, 90.0),
        count,
    })
}

/// Linear-interpolation percentile over an ascending-sorted slice.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = index_to_f64(sorted.len() - 1) * p / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = rank - index_to_f64(lower);
        (sorted[upper] - sorted[lower]).mul_add(fraction, sorted[lower])
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, Polygon};

    use super::*;
    use crate::transform::PixelTransform;

    fn transform() -> PixelTransform {
        PixelTransform {
            origin_x: 0.0,
            origin_y: 4.0,
            pixel_width: 1.0,
            pixel_height: -1.0,
        }
    }

    fn rect_zone(west: f64, south: f64, east: f64, north: f64) -> MultiPolygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: west, y: south },
                Coord { x: east, y: south },
                Coord { x: east, y: north },
                Coord { x: west, y: north },
                Coord { x: west, y: south },
            ]),
            vec![],
        )
        .into()
    }

    fn uniform_grid(value: f64) -> DensityGrid {
        DensityGrid::new(4, 4, vec![value; 16], transform(), None).unwrap()
    }

    #[test]
    fn percentiles_interpolate_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&values, 75.0) - 3.25).abs() < 1e-12);
        assert!((percentile(&values, 90.0) - 3.7).abs() < 1e-12);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_value_yields_flat_statistics() {
        let grid = uniform_grid(42.0);
        let zone = rect_zone(0.1, 3.1, 0.9, 3.9);
        let stats = zonal_stats(&grid, &zone).unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.min - 42.0).abs() < 1e-12);
        assert!((stats.max - 42.0).abs() < 1e-12);
        assert!((stats.median - 42.0).abs() < 1e-12);
        assert!((stats.p90 - 42.0).abs() < 1e-12);
    }

    #[test]
    fn sub_pixel_zone_still_touches_its_cell() {
        let grid = uniform_grid(10.0);
        // Entirely inside the top-left cell, far from its center.
        let zone = rect_zone(0.01, 3.9, 0.05, 3.95);
        let stats = zonal_stats(&grid, &zone).unwrap();
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn zone_straddling_cells_counts_all_touched_pixels() {
        let grid = uniform_grid(5.0);
        // Centered on the junction of four cells.
        let zone = rect_zone(0.9, 2.9, 1.1, 3.1);
        let stats = zonal_stats(&grid, &zone).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 5.0).abs() < 1e-12);
    }

    #[test]
    fn nodata_pixels_never_contribute() {
        let mut data = vec![f64::NAN; 16];
        data[0] = 100.0;
        let grid = DensityGrid::new(4, 4, data, transform(), None).unwrap();
        let zone = rect_zone(0.0, 0.0, 4.0, 4.0);
        let stats = zonal_stats(&grid, &zone).unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.mean - 100.0).abs() < 1e-12);
    }

    #[test]
    fn fully_nodata_zone_is_distinct_from_zeros() {
        let grid = DensityGrid::new(4, 4, vec![0.0; 16], transform(), None).unwrap();
        let zone = rect_zone(0.5, 0.5, 3.5, 3.5);
        assert!(zonal_stats(&grid, &zone).is_none());
    }

    #[test]
    fn zone_outside_the_window_has_no_statistics() {
        let grid = uniform_grid(3.0);
        let zone = rect_zone(100.0, 100.0, 101.0, 101.0);
        assert!(zonal_stats(&grid, &zone).is_none());
    }

    #[test]
    fn mixed_values_produce_ordered_statistics() {
        let data = vec![
            1.0, 2.0, 3.0, 4.0, // row 0
            5.0, 6.0, 7.0, 8.0, // row 1
            9.0, 10.0, 11.0, 12.0, // row 2
            13.0, 14.0, 15.0, 16.0, // row 3
        ];
        let grid = DensityGrid::new(4, 4, data, transform(), None).unwrap();
        let zone = rect_zone(0.0, 0.0, 4.0, 4.0);
        let stats = zonal_stats(&grid, &zone).unwrap();
        assert_eq!(stats.count, 16);
        assert!((stats.min - 1.0).abs() < 1e-12);
        assert!((stats.max - 16.0).abs() < 1e-12);
        assert!((stats.mean - 8.5).abs() < 1e-12);
        assert!((stats.median - 8.5).abs() < 1e-12);
        assert!(stats.p25 < stats.p50 && stats.p50 < stats.p75 && stats.p75 < stats.p90);
    }
}

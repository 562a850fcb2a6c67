//! Axis-aligned affine georeferencing.

use geo::{Coord, Rect};

/// Maps pixel (column, row) indices to world coordinates.
///
/// Only axis-aligned transforms are supported: `pixel_height` is negative for
/// the usual north-up rasters, and there are no rotation/shear terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelTransform {
    /// World x of the left edge of column 0.
    pub origin_x: f64,
    /// World y of the top edge of row 0.
    pub origin_y: f64,
    /// Column step in world units, positive eastward.
    pub pixel_width: f64,
    /// Row step in world units, negative for north-up rasters.
    pub pixel_height: f64,
}

impl PixelTransform {
    /// The upper-left corner of the pixel at (`col`, `row`), in world
    /// coordinates. Fractional indices interpolate along the grid.
    #[must_use]
    pub fn corner(&self, col: f64, row: f64) -> (f64, f64) {
        (
            col.mul_add(self.pixel_width, self.origin_x),
            row.mul_add(self.pixel_height, self.origin_y),
        )
    }

    /// The center of the pixel at integer indices (`col`, `row`).
    #[must_use]
    pub fn center(&self, col: f64, row: f64) -> (f64, f64) {
        self.corner(col + 0.5, row + 0.5)
    }

    /// The world-space rectangle covered by the pixel at (`col`, `row`).
    #[must_use]
    pub fn cell_rect(&self, col: f64, row: f64) -> Rect<f64> {
        let (x0, y0) = self.corner(col, row);
        let (x1, y1) = self.corner(col + 1.0, row + 1.0);
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    /// Fractional column index of world x.
    #[must_use]
    pub fn col_of_x(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.pixel_width
    }

    /// Fractional row index of world y.
    #[must_use]
    pub fn row_of_y(&self, y: f64) -> f64 {
        (y - self.origin_y) / self.pixel_height
    }

    /// The transform of a window whose upper-left pixel is (`col0`, `row0`)
    /// of this raster.
    #[must_use]
    pub fn window(&self, col0: f64, row0: f64) -> Self {
        let (origin_x, origin_y) = self.corner(col0, row0);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_up() -> PixelTransform {
        PixelTransform {
            origin_x: 34.0,
            origin_y: 1.0,
            pixel_width: 0.01,
            pixel_height: -0.01,
        }
    }

    #[test]
    fn corners_and_centers_follow_the_grid() {
        let t = north_up();
        assert_eq!(t.corner(0.0, 0.0), (34.0, 1.0));
        assert_eq!(t.corner(10.0, 5.0), (34.1, 0.95));
        let (cx, cy) = t.center(0.0, 0.0);
        assert!((cx - 34.005).abs() < 1e-12);
        assert!((cy - 0.995).abs() < 1e-12);
    }

    #[test]
    fn inverse_recovers_pixel_indices() {
        let t = north_up();
        assert!((t.col_of_x(34.1) - 10.0).abs() < 1e-9);
        assert!((t.row_of_y(0.95) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cell_rect_is_normalized_for_north_up_rasters() {
        let t = north_up();
        let rect = t.cell_rect(0.0, 0.0);
        assert!((rect.min().y - 0.99).abs() < 1e-12);
        assert!((rect.max().y - 1.0).abs() < 1e-12);
        assert!((rect.width() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn window_transform_shifts_the_origin() {
        let t = north_up().window(10.0, 20.0);
        assert!((t.origin_x - 34.1).abs() < 1e-12);
        assert!((t.origin_y - 0.8).abs() < 1e-12);
        assert!((t.pixel_width - 0.01).abs() < f64::EPSILON);
    }
}

//! In-memory raster windows.

use caresite_models::BoundingBox;

use crate::{RasterError, transform::PixelTransform};

/// Converts a pixel index to the f64 domain used by the georeferencing math.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn index_to_f64(index: usize) -> f64 {
    index as f64
}

/// One decoded raster window with its georeferencing.
///
/// Owns its pixels as f64 densities; validity of individual values follows
/// the nodata convention (finite, positive, not the declared nodata value).
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
    transform: PixelTransform,
    nodata: Option<f64>,
}

impl DensityGrid {
    /// Wraps a pixel buffer in row-major order.
    ///
    /// # Errors
    ///
    /// * `RasterError::Shape` when the buffer length is not
    ///   `width × height`.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        transform: PixelTransform,
        nodata: Option<f64>,
    ) -> Result<Self, RasterError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(RasterError::Shape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            nodata,
        })
    }

    /// Window width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Window height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Total pixel count of the window.
    #[must_use]
    pub const fn total_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether the window contains no pixels at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_pixels() == 0
    }

    /// Georeferencing of this window.
    #[must_use]
    pub const fn transform(&self) -> &PixelTransform {
        &self.transform
    }

    /// The declared nodata value, where the source carried one.
    #[must_use]
    pub const fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Pixel value at (`col`, `row`). Panics when out of bounds.
    #[must_use]
    pub fn value(&self, col: usize, row: usize) -> f64 {
        self.data[row * self.width + col]
    }

    /// Whether a value participates in statistics.
    #[must_use]
    pub fn is_valid_value(&self, value: f64) -> bool {
        value.is_finite() && value > 0.0 && self.nodata != Some(value)
    }

    /// All statistic-bearing values of the window.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .copied()
            .filter(|value| self.is_valid_value(*value))
    }

    /// Geographic extent of the window.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let (x0, y0) = self.transform.corner(0.0, 0.0);
        let (x1, y1) = self
            .transform
            .corner(index_to_f64(self.width), index_to_f64(self.height));
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

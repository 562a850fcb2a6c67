#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Population-density raster sampling.
//!
//! Reads `GeoTIFF` density rasters through windowed, chunk-granular access
//! (never the whole file when bounds are known), downsamples them into
//! visualization point clouds and computes zonal statistics over polygons.
//! Raster values that are not-a-number or ≤ 0 are nodata and excluded from
//! every statistic.

pub mod grid;
pub mod source;
pub mod surface;
pub mod transform;
pub mod zonal;

pub use grid::DensityGrid;
pub use source::{DensityRead, RasterSource};
pub use surface::{DensitySurface, SurfaceRange, density_surface};
pub use transform::PixelTransform;
pub use zonal::{ZonalStatistics, zonal_stats};

/// Errors from raster access and decoding.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// File could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF structure or compression could not be decoded.
    #[error("TIFF decode error: {0}")]
    Decode(#[from] tiff::TiffError),

    /// The raster uses a layout this sampler does not handle.
    #[error("Unsupported raster: {message}")]
    Unsupported {
        /// Description of the unsupported aspect.
        message: String,
    },

    /// Pixel buffer length does not match the declared dimensions.
    #[error("Raster shape mismatch: expected {expected} pixels, got {actual}")]
    Shape {
        /// Width × height.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },
}

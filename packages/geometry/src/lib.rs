#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar-approximation geometry for service-area analysis.
//!
//! Everything here works in WGS84 degree space with a documented flat-earth
//! model (111 km per degree of latitude, cosine-compressed longitude) and
//! only switches to a projected coordinate system for area measurement.
//! True geodesic computation is deliberately out of scope.

pub mod area;
pub mod buffer;
pub mod proj;
pub mod repair;

use geo::Point;

pub use area::{MeasuredArea, measure_area_km2, projected_area_km2};
pub use buffer::service_area;
pub use repair::{repair, repair_polygon};

/// Kilometers per degree of latitude in the planar buffer model.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Kilometers per degree used by the square-degree area fallback.
pub const FALLBACK_KM_PER_DEGREE: f64 = 111.319;

/// Latitudes at or beyond this magnitude are rejected by the buffer model;
/// the longitude scale factor diverges towards the poles.
pub const MAX_BUFFER_LATITUDE_DEG: f64 = 85.0;

/// Errors from geometry construction and measurement.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Buffer center or radius is not usable.
    #[error("Invalid geometry input: {message}")]
    InvalidInput {
        /// Description of what was wrong.
        message: String,
    },

    /// Latitude too close to a pole for the planar buffer model.
    #[error("Latitude {latitude} is outside the supported buffering range")]
    PolarLatitude {
        /// The offending latitude in degrees.
        latitude: f64,
    },

    /// Geometry could not be made valid.
    #[error("Geometry could not be repaired to a valid polygon")]
    RepairFailed,

    /// Coordinates could not be projected for measurement.
    #[error("Projection failed: {message}")]
    Projection {
        /// Description of what was wrong.
        message: String,
    },
}

/// Planar distance between two points in degree space.
///
/// Shares the buffer model's flat-earth approximation; callers convert
/// kilometers to degrees via [`KM_PER_DEGREE`].
#[must_use]
pub fn degree_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

//! Approximate geodesic-disc buffers in degree space.

use geo::{Coord, LineString, Point, Polygon, Scale};

use crate::{GeometryError, KM_PER_DEGREE, MAX_BUFFER_LATITUDE_DEG, repair};

/// Number of segments in the circle approximation.
const CIRCLE_SEGMENTS: u32 = 64;

/// Builds a polygon approximating a geodesic disc of `radius_km` around
/// `center`.
///
/// One degree of latitude is modeled as 111 km everywhere; one degree of
/// longitude at latitude L as 111·cos(L) km. The disc is built as a circle
/// with degree-radius `radius_km / 111` and then stretched along the
/// longitude axis by `1 / cos(L)` about its own center, which compensates
/// the longitudinal compression and keeps the ground footprint close to
/// circular.
///
/// # Errors
///
/// * `GeometryError::InvalidInput` when the center is non-finite or the
///   radius is non-positive or non-finite.
/// * `GeometryError::PolarLatitude` when |latitude| ≥ 85°, where the
///   longitude scale factor diverges.
/// * `GeometryError::RepairFailed` when the constructed ring is invalid and
///   cannot be repaired; callers treat this as "drop the point".
pub fn service_area(center: Point<f64>, radius_km: f64) -> Result<Polygon<f64>, GeometryError> {
    if !center.x().is_finite() || !center.y().is_finite() {
        return Err(GeometryError::InvalidInput {
            message: format!("non-finite buffer center ({}, {})", center.x(), center.y()),
        });
    }
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(GeometryError::InvalidInput {
            message: format!("buffer radius {radius_km} km is not a positive finite number"),
        });
    }
    let latitude = center.y();
    if latitude.abs() >= MAX_BUFFER_LATITUDE_DEG {
        return Err(GeometryError::PolarLatitude { latitude });
    }

    let radius_deg = radius_km / KM_PER_DEGREE;
    let lon_scale = 1.0 / latitude.to_radians().cos();

    let mut ring = Vec::with_capacity(CIRCLE_SEGMENTS as usize + 1);
    for i in 0..CIRCLE_SEGMENTS {
        let theta = std::f64::consts::TAU * f64::from(i) / f64::from(CIRCLE_SEGMENTS);
        ring.push(Coord {
            x: radius_deg.mul_add(theta.cos(), center.x()),
            y: radius_deg.mul_add(theta.sin(), center.y()),
        });
    }
    ring.push(ring[0]);

    let circle = Polygon::new(LineString::new(ring), vec![]);
    let stretched = circle.scale_around_point(lon_scale, 1.0, center);

    repair::into_valid_polygon(stretched)
}

//! Area measurement with a projected-first, approximate-fallback policy.

use geo::{Area, MultiPolygon};

use crate::{FALLBACK_KM_PER_DEGREE, GeometryError, proj};

/// A measured area with its accuracy provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredArea {
    /// Area in square kilometers.
    pub km2: f64,
    /// `true` when the square-degree fallback was used instead of a
    /// projected measurement; such figures are lower accuracy.
    pub approximate: bool,
}

/// Area of a degree-space geometry measured in its UTM zone.
///
/// # Errors
///
/// * `GeometryError::Projection` when the geometry cannot be projected
///   (empty, non-finite, or outside the UTM latitude range).
pub fn projected_area_km2(geometry: &MultiPolygon<f64>) -> Result<f64, GeometryError> {
    let (projected, _zone) = proj::project_to_utm(geometry)?;
    Ok(projected.unsigned_area() / 1_000_000.0)
}

/// Area in square kilometers, falling back to the square-degree
/// approximation (degree area × 111.319²) with a logged warning when
/// projection fails. The flag on the result marks the fallback.
#[must_use]
pub fn measure_area_km2(geometry: &MultiPolygon<f64>) -> MeasuredArea {
    if geometry.0.is_empty() {
        return MeasuredArea {
            km2: 0.0,
            approximate: false,
        };
    }
    match projected_area_km2(geometry) {
        Ok(km2) => MeasuredArea {
            km2,
            approximate: false,
        },
        Err(err) => {
            log::warn!("projected area measurement failed ({err}); using square-degree fallback");
            MeasuredArea {
                km2: geometry.unsigned_area() * FALLBACK_KM_PER_DEGREE * FALLBACK_KM_PER_DEGREE,
                approximate: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, Polygon};

    use super::*;

    fn square(west: f64, south: f64, size: f64) -> MultiPolygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: west, y: south },
                Coord {
                    x: west + size,
                    y: south,
                },
                Coord {
                    x: west + size,
                    y: south + size,
                },
                Coord {
                    x: west,
                    y: south + size,
                },
                Coord { x: west, y: south },
            ]),
            vec![],
        )
        .into()
    }

    #[test]
    fn projected_equatorial_square_matches_ellipsoid_truth() {
        // 0.1 x 0.1 degrees on the zone 36 central meridian: one degree of
        // latitude is 110.574 km, one degree of longitude 111.320 km, both
        // shrunk by k0.
        let area = projected_area_km2(&square(32.95, -0.05, 0.1)).unwrap();
        let expected = 110.574 * 111.320 * 0.01 * 0.9996 * 0.9996;
        assert!((area / expected - 1.0).abs() < 0.01, "area {area}");
    }

    #[test]
    fn measured_area_prefers_projection() {
        let measured = measure_area_km2(&square(34.0, -0.2, 0.1));
        assert!(!measured.approximate);
        assert!(measured.km2 > 100.0 && measured.km2 < 140.0);
    }

    #[test]
    fn unprojectable_geometry_falls_back_flagged() {
        let polar = square(10.0, 85.0, 0.5);
        let measured = measure_area_km2(&polar);
        assert!(measured.approximate);
        let expected = 0.25 * FALLBACK_KM_PER_DEGREE * FALLBACK_KM_PER_DEGREE;
        assert!((measured.km2 - expected).abs() < 1e-6);
    }

    #[test]
    fn empty_geometry_measures_zero_exactly() {
        let measured = measure_area_km2(&MultiPolygon::new(vec![]));
        assert!(!measured.approximate);
        assert!(measured.km2.abs() < f64::EPSILON);
    }
}

//! WGS84 to UTM forward projection.
//!
//! A minimal transverse Mercator implementation (standard series expansion on
//! the WGS84 ellipsoid) used only to measure areas in a locally appropriate
//! metric system. The zone is picked per geometry from its centroid.

use geo::{Centroid, Coord, LineString, MultiPolygon, Polygon};

use crate::GeometryError;

/// WGS84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Scale factor on the UTM central meridian.
const UTM_K0: f64 = 0.9996;
/// False easting applied to every zone, in meters.
const FALSE_EASTING: f64 = 500_000.0;
/// False northing applied in the southern hemisphere, in meters.
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
/// UTM is undefined beyond this latitude magnitude.
const MAX_UTM_LATITUDE_DEG: f64 = 84.0;

/// A UTM zone (1–60) with its hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    /// Zone number, 1 through 60.
    pub number: u8,
    /// Whether the southern false northing applies.
    pub southern: bool,
}

impl UtmZone {
    /// The zone containing the given WGS84 coordinate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn containing(longitude: f64, latitude: f64) -> Self {
        let index = ((longitude + 180.0) / 6.0).floor().clamp(0.0, 59.0);
        Self {
            number: index as u8 + 1,
            southern: latitude < 0.0,
        }
    }

    /// Central meridian of the zone in degrees.
    #[must_use]
    pub fn central_meridian(self) -> f64 {
        f64::from(self.number).mul_add(6.0, -183.0)
    }

    /// Projects a WGS84 coordinate to easting/northing meters in this zone.
    ///
    /// # Errors
    ///
    /// * `GeometryError::Projection` for non-finite input or latitudes
    ///   outside the UTM definition range (|latitude| > 84°).
    #[allow(clippy::suboptimal_flops, clippy::many_single_char_names)]
    pub fn forward(self, longitude: f64, latitude: f64) -> Result<(f64, f64), GeometryError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(GeometryError::Projection {
                message: format!("non-finite coordinate ({longitude}, {latitude})"),
            });
        }
        if latitude.abs() > MAX_UTM_LATITUDE_DEG {
            return Err(GeometryError::Projection {
                message: format!("latitude {latitude} outside the UTM definition range"),
            });
        }

        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);
        let lat = latitude.to_radians();
        let dlon = (longitude - self.central_meridian()).to_radians();

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = ep2 * cos_lat * cos_lat;
        let a = dlon * cos_lat;

        // Meridional arc from the equator (series in the eccentricity).
        let m = WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0)
                    * (2.0 * lat).sin()
                + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * lat).sin());

        let easting = UTM_K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;

        let mut northing = UTM_K0
            * (m + n
                * tan_lat
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if self.southern {
            northing += FALSE_NORTHING_SOUTH;
        }

        Ok((easting, northing))
    }
}

/// Projects a degree-space multipolygon into the UTM zone of its centroid.
///
/// # Errors
///
/// * `GeometryError::Projection` when the geometry is empty (no centroid) or
///   any coordinate is outside the projectable range.
pub fn project_to_utm(
    geometry: &MultiPolygon<f64>,
) -> Result<(MultiPolygon<f64>, UtmZone), GeometryError> {
    let Some(centroid) = geometry.centroid() else {
        return Err(GeometryError::Projection {
            message: "cannot project an empty geometry".to_string(),
        });
    };
    let zone = UtmZone::containing(centroid.x(), centroid.y());
    let polygons = geometry
        .0
        .iter()
        .map(|polygon| project_polygon(polygon, zone))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((MultiPolygon::new(polygons), zone))
}

fn project_polygon(polygon: &Polygon<f64>, zone: UtmZone) -> Result<Polygon<f64>, GeometryError> {
    let exterior = project_ring(polygon.exterior(), zone)?;
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| project_ring(ring, zone))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn project_ring(ring: &LineString<f64>, zone: UtmZone) -> Result<LineString<f64>, GeometryError> {
    let coords = ring
        .coords()
        .map(|coord| {
            zone.forward(coord.x, coord.y)
                .map(|(x, y)| Coord { x, y })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_number_follows_longitude() {
        assert_eq!(UtmZone::containing(34.76, -0.09).number, 36);
        assert_eq!(UtmZone::containing(-0.1, 51.5).number, 30);
        assert_eq!(UtmZone::containing(-180.0, 0.0).number, 1);
        assert_eq!(UtmZone::containing(179.9, 0.0).number, 60);
    }

    #[test]
    fn hemisphere_follows_latitude_sign() {
        assert!(UtmZone::containing(34.76, -0.09).southern);
        assert!(!UtmZone::containing(34.76, 0.09).southern);
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let zone = UtmZone {
            number: 36,
            southern: false,
        };
        assert!((zone.central_meridian() - 33.0).abs() < f64::EPSILON);

        let (easting, northing) = zone.forward(33.0, 0.0).unwrap();
        assert!((easting - 500_000.0).abs() < 1e-6);
        assert!(northing.abs() < 1e-6);
    }

    #[test]
    fn southern_equator_carries_false_northing() {
        let zone = UtmZone {
            number: 36,
            southern: true,
        };
        let (_, northing) = zone.forward(33.0, 0.0).unwrap();
        assert!((northing - 10_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn meridian_distances_scale_by_k0() {
        let zone = UtmZone {
            number: 36,
            southern: false,
        };
        let (_, n0) = zone.forward(33.0, 0.0).unwrap();
        let (_, n1) = zone.forward(33.0, 0.01).unwrap();
        // 0.01 degrees of latitude at the equator is about 1105.7 meters of
        // arc, shrunk by the central-meridian scale factor.
        let expected = 1105.74 * 0.9996;
        assert!(((n1 - n0) - expected).abs() < 1.0);
    }

    #[test]
    fn latitudes_beyond_utm_range_fail() {
        let zone = UtmZone {
            number: 36,
            southern: false,
        };
        assert!(matches!(
            zone.forward(33.0, 86.0),
            Err(GeometryError::Projection { .. })
        ));
        assert!(matches!(
            zone.forward(f64::NAN, 0.0),
            Err(GeometryError::Projection { .. })
        ));
    }

    #[test]
    fn empty_geometry_cannot_be_projected() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(matches!(
            project_to_utm(&empty),
            Err(GeometryError::Projection { .. })
        ));
    }
}

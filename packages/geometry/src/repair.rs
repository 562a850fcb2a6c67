//! Polygon validity repair.
//!
//! Boolean operations require valid (non-self-intersecting) operands.
//! Invalid rings are re-noded through a union with an empty geometry, the
//! planar equivalent of the zero-width-buffer fix; geometry that stays
//! invalid after that is reported so the owning entity can be skipped.

use geo::{Area, BooleanOps, MultiPolygon, Polygon, Validation};

use crate::GeometryError;

/// Returns a valid version of `geometry`, re-noding it when necessary.
///
/// # Errors
///
/// * `GeometryError::RepairFailed` when the geometry is still invalid after
///   re-noding.
pub fn repair(geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
    if geometry.is_valid() {
        return Ok(geometry.clone());
    }
    log::debug!("re-noding invalid geometry via self-union");
    let repaired = geometry.union(&MultiPolygon::<f64>::new(vec![]));
    if repaired.is_valid() {
        Ok(repaired)
    } else {
        Err(GeometryError::RepairFailed)
    }
}

/// [`repair`] for a single polygon, normalizing to a multipolygon since
/// re-noding can split one ring into several.
///
/// # Errors
///
/// * `GeometryError::RepairFailed` when the polygon is still invalid after
///   re-noding.
pub fn repair_polygon(polygon: &Polygon<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
    repair(&MultiPolygon::new(vec![polygon.clone()]))
}

/// Like [`repair_polygon`] but keeps the single-polygon shape, taking the
/// largest member if re-noding split the ring.
///
/// # Errors
///
/// * `GeometryError::RepairFailed` when the polygon cannot be made valid or
///   repairs to an empty geometry.
pub fn into_valid_polygon(polygon: Polygon<f64>) -> Result<Polygon<f64>, GeometryError> {
    if polygon.is_valid() {
        return Ok(polygon);
    }
    let repaired = repair_polygon(&polygon)?;
    repaired
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .ok_or(GeometryError::RepairFailed)
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::*;

    fn bowtie() -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 2.0, y: 2.0 },
                Coord { x: 2.0, y: 0.0 },
                Coord { x: 0.0, y: 2.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        )
    }

    #[test]
    fn bowtie_is_repaired_to_valid_geometry() {
        let crossed = bowtie();
        assert!(!crossed.is_valid());

        let repaired = repair_polygon(&crossed).unwrap();
        assert!(repaired.is_valid());
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn valid_geometry_passes_through_unchanged() {
        let square = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 0.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        let repaired = repair_polygon(&square).unwrap();
        assert!(repaired.is_valid());
        assert!((repaired.unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn repair_keeps_empty_multipolygon_empty() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        let repaired = repair(&empty).unwrap();
        assert!(repaired.0.is_empty());
    }
}

//! Coverage computation and per-ward apportionment.

use caresite_geometry::{measure_area_km2, repair, service_area};
use caresite_models::{Boundary, Facility, SitingConfig, Ward};
use geo::{BooleanOps, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::{CoverageError, union::batched_union};

/// Coverage of a single ward.
///
/// Population apportionment assumes uniform population density within the
/// ward: the served share of the population equals the served share of the
/// area. That is a modeling approximation, not a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardCoverage {
    /// Ward name.
    pub name: String,
    /// Ward population.
    pub population: f64,
    /// Ward area in square kilometers.
    pub area_km2: f64,
    /// Area within reach of an existing facility, in square kilometers.
    pub served_area_km2: f64,
    /// Area outside every service buffer, in square kilometers.
    pub gap_area_km2: f64,
    /// Population apportioned to the served area.
    pub served_population: f64,
    /// Population apportioned to the gap; always
    /// `population - served_population`.
    pub gap_population: f64,
    /// Served share of the ward area, as a percentage.
    pub coverage_percent: f64,
}

/// County-wide coverage statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    /// Facilities whose service buffer entered the union.
    pub facility_count: usize,
    /// Boundary area in square kilometers.
    pub total_area_km2: f64,
    /// Area covered by the merged service buffers, post-clip.
    pub covered_area_km2: f64,
    /// Area of the gap polygon.
    pub gap_area_km2: f64,
    /// Covered share of the boundary, as a percentage.
    pub coverage_percent: f64,
    /// Sum of per-ward served populations.
    pub served_population: f64,
    /// Sum of per-ward gap populations.
    pub underserved_population: f64,
    /// `true` when any area figure fell back to the square-degree
    /// approximation instead of a projected measurement.
    pub approximate_area: bool,
    /// Per-ward breakdown, in the input ward order (irreparable wards are
    /// skipped).
    pub wards: Vec<WardCoverage>,
    /// Merged service area clipped to the boundary, as GeoJSON.
    pub service_area: geojson::Geometry,
    /// Gap polygon (boundary minus merged buffers), as GeoJSON.
    pub gap_polygon: geojson::Geometry,
}

/// A ward's repaired geometry with its served share, for downstream scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct WardFootprint {
    /// Ward name.
    pub name: String,
    /// Ward population.
    pub population: f64,
    /// Repaired ward geometry.
    pub geometry: MultiPolygon<f64>,
    /// Served share of the ward area, clamped to [0, 1].
    pub served_fraction: f64,
}

/// Everything a coverage run produces: the wire-facing result plus the
/// geometries downstream stages keep working with.
#[derive(Debug, Clone)]
pub struct CoverageOutcome {
    /// Wire-facing statistics.
    pub result: CoverageResult,
    /// Repaired county boundary, so downstream stages work on the same
    /// geometry the coverage figures were measured against.
    pub boundary: MultiPolygon<f64>,
    /// Merged service buffers clipped to the boundary.
    pub merged_buffer: MultiPolygon<f64>,
    /// Gap polygon (boundary minus merged buffers).
    pub gap: MultiPolygon<f64>,
    /// Repaired wards with served fractions, in input order.
    pub ward_footprints: Vec<WardFootprint>,
}

/// Computes current service coverage for a facility set over a boundary.
///
/// Facilities whose buffer cannot be built or repaired are skipped with a
/// warning, as are wards with irreparable geometry. Zero usable buffers is
/// not an error: the gap is then the whole boundary and coverage is zero.
///
/// # Errors
///
/// * `CoverageError::InvalidBoundary` when the boundary geometry itself
///   cannot be repaired; nothing can be computed without it.
pub fn compute_coverage(
    facilities: &[Facility],
    boundary: &Boundary,
    wards: &[Ward],
    config: &SitingConfig,
) -> Result<CoverageOutcome, CoverageError> {
    let Ok(boundary_geom) = repair(&boundary.geometry) else {
        return Err(CoverageError::InvalidBoundary {
            name: boundary.name.clone(),
        });
    };

    let buffers = facility_buffers(facilities, config);
    log::info!(
        "built {} service buffers from {} facilities",
        buffers.len(),
        facilities.len()
    );

    let facility_count = buffers.len();
    let merged = batched_union(&buffers, config.union_batch_size);
    let clipped = merged.intersection(&boundary_geom);
    let gap = boundary_geom.difference(&clipped);

    let total = measure_area_km2(&boundary_geom);
    let covered = measure_area_km2(&clipped);
    let gap_area = measure_area_km2(&gap);
    let mut approximate = total.approximate || covered.approximate || gap_area.approximate;

    let coverage_percent = if total.km2 > 0.0 {
        covered.km2 / total.km2 * 100.0
    } else {
        0.0
    };

    let mut ward_footprints = Vec::with_capacity(wards.len());
    let mut ward_coverages = Vec::with_capacity(wards.len());
    let mut served_population = 0.0;
    let mut underserved_population = 0.0;

    for ward in wards {
        let Ok(geometry) = repair(&ward.geometry) else {
            log::warn!("skipping ward {}: geometry could not be repaired", ward.name);
            continue;
        };

        let ward_area = measure_area_km2(&geometry);
        let served_geom = geometry.intersection(&clipped);
        let served_area = measure_area_km2(&served_geom);
        approximate = approximate || ward_area.approximate || served_area.approximate;

        let served_fraction = if ward_area.km2 > 0.0 {
            (served_area.km2 / ward_area.km2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let served_pop = ward.population * served_fraction;
        let gap_pop = ward.population - served_pop;
        served_population += served_pop;
        underserved_population += gap_pop;

        ward_coverages.push(WardCoverage {
            name: ward.name.clone(),
            population: ward.population,
            area_km2: ward_area.km2,
            served_area_km2: served_area.km2,
            gap_area_km2: (ward_area.km2 - served_area.km2).max(0.0),
            served_population: served_pop,
            gap_population: gap_pop,
            coverage_percent: served_fraction * 100.0,
        });
        ward_footprints.push(WardFootprint {
            name: ward.name.clone(),
            population: ward.population,
            geometry,
            served_fraction,
        });
    }

    let result = CoverageResult {
        facility_count,
        total_area_km2: total.km2,
        covered_area_km2: covered.km2,
        gap_area_km2: gap_area.km2,
        coverage_percent,
        served_population,
        underserved_population,
        approximate_area: approximate,
        wards: ward_coverages,
        service_area: geojson::Geometry::new(geojson::Value::from(&clipped)),
        gap_polygon: geojson::Geometry::new(geojson::Value::from(&gap)),
    };

    Ok(CoverageOutcome {
        result,
        boundary: boundary_geom,
        merged_buffer: clipped,
        gap,
        ward_footprints,
    })
}

/// One repaired buffer per facility, skipping facilities whose buffer
/// cannot be built.
fn facility_buffers(facilities: &[Facility], config: &SitingConfig) -> Vec<Polygon<f64>> {
    let mut buffers = Vec::with_capacity(facilities.len());
    for facility in facilities {
        let radius_km = config.radius_km_for(&facility.facility_type);
        match service_area(facility.location(), radius_km) {
            Ok(buffer) => buffers.push(buffer),
            Err(err) => {
                log::warn!("skipping facility {}: {err}", facility.name);
            }
        }
    }
    buffers
}

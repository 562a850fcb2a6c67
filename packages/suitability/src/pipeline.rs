//! The end-to-end suitability pipeline and wire-level reports.

use std::time::Instant;

use caresite_coverage::{CoverageResult, compute_coverage};
use caresite_geometry::{KM_PER_DEGREE, measure_area_km2, repair};
use caresite_models::{Boundary, BoundingBox, Facility, RasterDatasetInfo, SitingConfig, Ward};
use caresite_raster::{
    DensityRead, DensitySurface, ZonalStatistics, density_surface, zonal_stats,
};
use chrono::{DateTime, Utc};
use geo::{BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::{
    Deadline, SuitabilityError,
    grid::CandidateGrid,
    scoring::{ScoringContext, score_candidate},
    selection::{SelectedSite, Selection, select_top_k},
};

/// The reference data one analysis runs over, as listed by the stores.
#[derive(Debug, Clone)]
pub struct RegionData {
    /// Existing facilities of the region.
    pub facilities: Vec<Facility>,
    /// County boundary.
    pub boundary: Boundary,
    /// Ward polygons with population attributes.
    pub wards: Vec<Ward>,
}

/// A wire-level suitability request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuitabilityRequest {
    /// Facility type the candidates are scored as.
    pub facility_type: String,
    /// Number of sites to recommend; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    /// Optional bounding box restricting the analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    /// Optional clipping polygon restricting the analysis (GeoJSON Polygon
    /// or MultiPolygon). Takes precedence over `bounds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<geojson::Geometry>,
}

impl SuitabilityRequest {
    /// A plain request for the given facility type with no clipping.
    #[must_use]
    pub fn for_type(facility_type: &str) -> Self {
        Self {
            facility_type: facility_type.to_string(),
            k: None,
            bounds: None,
            clip: None,
        }
    }
}

/// The wire-level result of one suitability analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuitabilityReport {
    /// Facility type the recommendations are for.
    pub facility_type: String,
    /// Density dataset name.
    pub dataset: String,
    /// Density dataset reference year.
    pub year: i32,
    /// `true` when the gap was empty and no candidates were generated.
    pub full_coverage: bool,
    /// Coverage statistics, including the gap polygon as GeoJSON.
    pub coverage: CoverageResult,
    /// County-wide density statistics; `None` when the raster held no valid
    /// data over the boundary.
    pub county_density: Option<ZonalStatistics>,
    /// Ranked recommendations as GeoJSON point features with score
    /// properties.
    pub recommendations: geojson::FeatureCollection,
    /// Lattice points generated over the gap.
    pub candidates_total: usize,
    /// Candidates examined before the deadline cut in.
    pub candidates_evaluated: usize,
    /// Candidates that survived scoring.
    pub candidates_scored: usize,
    /// Separation threshold finally in effect, in kilometers.
    pub final_separation_km: f64,
    /// `true` when the deadline expired mid-scoring and the ranking covers
    /// only part of the candidate set.
    pub truncated: bool,
    /// Wall-clock processing time in seconds.
    pub processing_seconds: f64,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}

/// Runs the full analysis: coverage, candidate generation, scoring under the
/// deadline, and diversified selection.
///
/// The raster is read once, windowed to the boundary extent, for the whole
/// batch. An empty gap short-circuits to a full-coverage report with no
/// recommendations.
///
/// # Errors
///
/// * `SuitabilityError::InvalidInput` for an empty facility type, a zero
///   site count, or a malformed/non-intersecting clip geometry.
/// * `SuitabilityError::Coverage` when the boundary is unusable.
/// * `SuitabilityError::Raster` when the density window cannot be read.
/// * `SuitabilityError::DeadlineExpired` when the deadline passed before any
///   candidate was scored.
/// * `SuitabilityError::NoViableCandidates` when a non-empty gap produced no
///   scoreable candidate.
pub fn run_suitability<R: DensityRead>(
    region: &RegionData,
    raster: &mut R,
    dataset: &RasterDatasetInfo,
    config: &SitingConfig,
    request: &SuitabilityRequest,
    mut deadline: Deadline,
) -> Result<SuitabilityReport, SuitabilityError> {
    let started = Instant::now();

    if request.facility_type.trim().is_empty() {
        return Err(SuitabilityError::InvalidInput {
            message: "facility type must not be empty".to_string(),
        });
    }
    let k = request.k.unwrap_or(config.default_selection_size);
    if k == 0 {
        return Err(SuitabilityError::InvalidInput {
            message: "requested site count must be positive".to_string(),
        });
    }

    let analyzed: Vec<Facility> = region
        .facilities
        .iter()
        .filter(|facility| !config.is_excluded(&facility.facility_type))
        .cloned()
        .collect();
    log::info!(
        "scoring {} sites over {} of {} facilities",
        request.facility_type,
        analyzed.len(),
        region.facilities.len()
    );

    let outcome = compute_coverage(&analyzed, &region.boundary, &region.wards, config)?;
    let gap = clip_gap(&outcome.gap, request)?;

    if gap.0.is_empty() {
        log::info!("no coverage gap remains; skipping candidate generation");
        return Ok(SuitabilityReport {
            facility_type: request.facility_type.clone(),
            dataset: dataset.name.clone(),
            year: dataset.year,
            full_coverage: true,
            coverage: outcome.result,
            county_density: None,
            recommendations: empty_features(),
            candidates_total: 0,
            candidates_evaluated: 0,
            candidates_scored: 0,
            final_separation_km: config.min_separation_km_for(&request.facility_type),
            truncated: false,
            processing_seconds: started.elapsed().as_secs_f64(),
            generated_at: Utc::now(),
        });
    }

    let bounds =
        geometry_bounds(&outcome.boundary).ok_or_else(|| SuitabilityError::InvalidInput {
            message: "boundary geometry has no extent".to_string(),
        })?;
    // Service buffers of edge candidates reach past the boundary extent, so
    // the window carries one service radius of margin on every side.
    let margin_deg = config.radius_km_for(&request.facility_type) / KM_PER_DEGREE;
    let window = raster.read_window(Some(&bounds.expanded(margin_deg)))?;
    let county_density = zonal_stats(&window, &outcome.boundary);
    let county_max = county_density.map_or(0.0, |stats| stats.max);

    let lattice = CandidateGrid::new(&gap);
    let candidates: Vec<Point<f64>> = lattice.iter().collect();
    let candidates_total = candidates.len();
    log::info!("generated {candidates_total} candidate points over the gap");

    let ctx = ScoringContext::new(
        config,
        &request.facility_type,
        &outcome.ward_footprints,
        county_max,
        &window,
    );

    let mut scored = Vec::new();
    let mut evaluated = 0_usize;
    let mut truncated = false;
    for point in candidates {
        if deadline.expired() {
            log::warn!(
                "deadline expired after {evaluated} of {candidates_total} candidates; truncating"
            );
            truncated = true;
            break;
        }
        evaluated += 1;
        match score_candidate(point, &ctx) {
            Ok(candidate) => scored.push(candidate),
            Err(err) => {
                log::warn!(
                    "dropping candidate ({}, {}): {err}",
                    point.x(),
                    point.y()
                );
            }
        }
    }

    if scored.is_empty() {
        return Err(if truncated {
            SuitabilityError::DeadlineExpired
        } else {
            SuitabilityError::NoViableCandidates
        });
    }
    let candidates_scored = scored.len();

    let selection = select_top_k(scored, k, &request.facility_type, config);
    log::info!(
        "selected {} of {candidates_scored} scored candidates at {:.2} km separation",
        selection.sites.len(),
        selection.final_separation_km
    );

    Ok(SuitabilityReport {
        facility_type: request.facility_type.clone(),
        dataset: dataset.name.clone(),
        year: dataset.year,
        full_coverage: false,
        coverage: outcome.result,
        county_density,
        recommendations: feature_collection(&selection),
        candidates_total,
        candidates_evaluated: evaluated,
        candidates_scored,
        final_separation_km: selection.final_separation_km,
        truncated,
        processing_seconds: started.elapsed().as_secs_f64(),
        generated_at: Utc::now(),
    })
}

/// Builds the downsampled density surface for a region, optionally windowed
/// to requested bounds.
///
/// # Errors
///
/// * `SuitabilityError::InvalidInput` when the bounds are malformed or do
///   not intersect the region.
/// * `SuitabilityError::Raster` when the window cannot be read.
pub fn density_surface_report<R: DensityRead>(
    raster: &mut R,
    dataset: &RasterDatasetInfo,
    boundary: &Boundary,
    bounds: Option<&BoundingBox>,
) -> Result<DensitySurface, SuitabilityError> {
    let region =
        geometry_bounds(&boundary.geometry).ok_or_else(|| SuitabilityError::InvalidInput {
            message: "boundary geometry has no extent".to_string(),
        })?;
    let window_bounds = match bounds {
        None => region,
        Some(requested) => {
            if !requested.is_well_formed() {
                return Err(SuitabilityError::InvalidInput {
                    message: "requested bounds are malformed".to_string(),
                });
            }
            requested
                .intersection(&region)
                .ok_or_else(|| SuitabilityError::InvalidInput {
                    message: "requested bounds do not intersect the region".to_string(),
                })?
        }
    };

    let window = raster.read_window(Some(&window_bounds))?;
    Ok(density_surface(&window, &dataset.name, dataset.year))
}

/// Zonal density statistics and population estimate for an arbitrary
/// polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDensityReport {
    /// Density dataset name.
    pub dataset: String,
    /// Density dataset reference year.
    pub year: i32,
    /// Polygon area in square kilometers.
    pub area_km2: f64,
    /// `true` when the area used the square-degree fallback.
    pub approximate_area: bool,
    /// Statistics over the polygon footprint; `None` when the raster held no
    /// valid data there, which is distinct from a zone of zeros.
    pub stats: Option<ZonalStatistics>,
    /// Mean density × area; 0 when there were no statistics.
    pub estimated_population: f64,
}

/// Runs the density/zonal query of the wire contract over one polygon.
///
/// # Errors
///
/// * `SuitabilityError::InvalidInput` when the polygon is irreparable or has
///   no extent.
/// * `SuitabilityError::Raster` when the window cannot be read.
pub fn area_density_report<R: DensityRead>(
    raster: &mut R,
    dataset: &RasterDatasetInfo,
    polygon: &MultiPolygon<f64>,
) -> Result<AreaDensityReport, SuitabilityError> {
    let zone = repair(polygon).map_err(|err| SuitabilityError::InvalidInput {
        message: format!("query polygon is unusable: {err}"),
    })?;
    let bounds = geometry_bounds(&zone).ok_or_else(|| SuitabilityError::InvalidInput {
        message: "query polygon has no extent".to_string(),
    })?;

    let window = raster.read_window(Some(&bounds))?;
    let stats = zonal_stats(&window, &zone);
    let measured = measure_area_km2(&zone);

    Ok(AreaDensityReport {
        dataset: dataset.name.clone(),
        year: dataset.year,
        area_km2: measured.km2,
        approximate_area: measured.approximate,
        stats,
        estimated_population: stats.map_or(0.0, |s| s.mean * measured.km2),
    })
}

/// Applies the request's clip polygon or bounds to the gap.
fn clip_gap(
    gap: &MultiPolygon<f64>,
    request: &SuitabilityRequest,
) -> Result<MultiPolygon<f64>, SuitabilityError> {
    let Some(clip) = clip_geometry(request)? else {
        return Ok(gap.clone());
    };
    let clipped = gap.intersection(&clip);
    if clipped.0.is_empty() && !gap.0.is_empty() {
        return Err(SuitabilityError::InvalidInput {
            message: "clip geometry does not intersect the coverage gap".to_string(),
        });
    }
    Ok(clipped)
}

fn clip_geometry(
    request: &SuitabilityRequest,
) -> Result<Option<MultiPolygon<f64>>, SuitabilityError> {
    if let Some(geometry) = &request.clip {
        let parsed: geo::Geometry<f64> =
            geo::Geometry::try_from(geometry.value.clone()).map_err(|err| {
                SuitabilityError::InvalidInput {
                    message: format!("clip geometry is not convertible: {err}"),
                }
            })?;
        let multi = match parsed {
            geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            geo::Geometry::MultiPolygon(multi) => multi,
            _ => {
                return Err(SuitabilityError::InvalidInput {
                    message: "clip geometry must be a Polygon or MultiPolygon".to_string(),
                });
            }
        };
        let repaired = repair(&multi).map_err(|err| SuitabilityError::InvalidInput {
            message: format!("clip geometry is unusable: {err}"),
        })?;
        return Ok(Some(repaired));
    }

    if let Some(bounds) = &request.bounds {
        if !bounds.is_well_formed() {
            return Err(SuitabilityError::InvalidInput {
                message: "clip bounds are malformed".to_string(),
            });
        }
        return Ok(Some(bounds_polygon(bounds)));
    }

    Ok(None)
}

fn bounds_polygon(bounds: &BoundingBox) -> MultiPolygon<f64> {
    Polygon::new(
        LineString::new(vec![
            Coord {
                x: bounds.west,
                y: bounds.south,
            },
            Coord {
                x: bounds.east,
                y: bounds.south,
            },
            Coord {
                x: bounds.east,
                y: bounds.north,
            },
            Coord {
                x: bounds.west,
                y: bounds.north,
            },
            Coord {
                x: bounds.west,
                y: bounds.south,
            },
        ]),
        vec![],
    )
    .into()
}

fn geometry_bounds(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(|rect| {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    })
}

fn empty_features() -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

/// Ranked sites as GeoJSON point features with the score breakdown in the
/// properties.
fn feature_collection(selection: &Selection) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: selection.sites.iter().map(site_feature).collect(),
        foreign_members: None,
    }
}

fn site_feature(site: &SelectedSite) -> geojson::Feature {
    let properties = match serde_json::to_value(site) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    };
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
            site.candidate.longitude,
            site.candidate.latitude,
        ]))),
        id: None,
        properties,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use caresite_geometry::degree_distance;
    use caresite_raster::{DensityGrid, PixelTransform, RasterError};

    use super::*;

    /// 20 km expressed in the 111 km/degree model.
    const SIDE_DEG: f64 = 20.0 / 111.0;

    struct StaticRaster(DensityGrid);

    impl DensityRead for StaticRaster {
        fn read_window(
            &mut self,
            _bounds: Option<&BoundingBox>,
        ) -> Result<DensityGrid, RasterError> {
            Ok(self.0.clone())
        }
    }

    struct RecordingRaster {
        grid: DensityGrid,
        bounds_seen: Option<BoundingBox>,
    }

    impl DensityRead for RecordingRaster {
        fn read_window(
            &mut self,
            bounds: Option<&BoundingBox>,
        ) -> Result<DensityGrid, RasterError> {
            self.bounds_seen = bounds.copied();
            Ok(self.grid.clone())
        }
    }

    fn square_geom(west: f64, south: f64, width: f64, height: f64) -> MultiPolygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: west, y: south },
                Coord {
                    x: west + width,
                    y: south,
                },
                Coord {
                    x: west + width,
                    y: south + height,
                },
                Coord {
                    x: west,
                    y: south + height,
                },
                Coord { x: west, y: south },
            ]),
            vec![],
        )
        .into()
    }

    /// A 20 km × 20 km county at the equator with one ward of 100 000
    /// people.
    fn region(facilities: Vec<Facility>) -> RegionData {
        RegionData {
            facilities,
            boundary: Boundary {
                name: "Test County".to_string(),
                population: 100_000.0,
                geometry: square_geom(34.0, -SIDE_DEG, SIDE_DEG, SIDE_DEG),
            },
            wards: vec![Ward {
                name: "Central".to_string(),
                subcounty: None,
                population: 100_000.0,
                geometry: square_geom(34.0, -SIDE_DEG, SIDE_DEG, SIDE_DEG),
            }],
        }
    }

    fn central_health_center() -> Facility {
        Facility {
            id: 1,
            name: "Central HC".to_string(),
            facility_type: "Health Center".to_string(),
            capacity: Some(24),
            longitude: 34.0 + SIDE_DEG / 2.0,
            latitude: -SIDE_DEG / 2.0,
        }
    }

    fn config_3km() -> SitingConfig {
        let mut config = SitingConfig::default();
        config
            .radius_by_type
            .insert("Health Center".to_string(), 3.0);
        config
            .min_separation_by_type
            .insert("Health Center".to_string(), 3.0);
        // Small enough that the population factor saturates everywhere under
        // the uniform test raster.
        config
            .expected_population_by_type
            .insert("Health Center".to_string(), 2000.0);
        config
    }

    /// Uniform 100 persons/km² over the county extent, ~1 km pixels.
    fn uniform_raster(value: f64) -> StaticRaster {
        let pixels = 20_usize;
        let transform = PixelTransform {
            origin_x: 34.0,
            origin_y: 0.0,
            pixel_width: SIDE_DEG / 20.0,
            pixel_height: -SIDE_DEG / 20.0,
        };
        StaticRaster(
            DensityGrid::new(pixels, pixels, vec![value; pixels * pixels], transform, None)
                .unwrap(),
        )
    }

    fn nodata_raster() -> StaticRaster {
        let transform = PixelTransform {
            origin_x: 34.0,
            origin_y: 0.0,
            pixel_width: SIDE_DEG / 20.0,
            pixel_height: -SIDE_DEG / 20.0,
        };
        StaticRaster(DensityGrid::new(20, 20, vec![f64::NAN; 400], transform, None).unwrap())
    }

    fn dataset() -> RasterDatasetInfo {
        RasterDatasetInfo {
            name: "test_density".to_string(),
            description: None,
            year: 2020,
            path: "test_density_2020.tif".into(),
            source: None,
        }
    }

    fn feature_point(feature: &geojson::Feature) -> Point<f64> {
        match &feature.geometry {
            Some(geometry) => match &geometry.value {
                geojson::Value::Point(coords) => Point::new(coords[0], coords[1]),
                other => panic!("expected a point, got {other:?}"),
            },
            None => panic!("feature without geometry"),
        }
    }

    #[test]
    fn central_facility_scenario_ranks_distant_gap_sites_first() {
        let region = region(vec![central_health_center()]);
        let mut raster = uniform_raster(100.0);
        let request = SuitabilityRequest::for_type("Health Center");

        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();

        // A 3 km disc over a 20 km square: pi * 9 / 400 of the area.
        let expected_percent = std::f64::consts::PI * 9.0 / 400.0 * 100.0;
        assert!(
            (report.coverage.coverage_percent - expected_percent).abs() < 0.5,
            "coverage {}",
            report.coverage.coverage_percent
        );
        assert!(!report.full_coverage);
        assert!(!report.truncated);
        assert!(report.candidates_total > 0);
        assert_eq!(report.candidates_evaluated, report.candidates_total);
        assert!(!report.recommendations.features.is_empty());
        assert!(report.recommendations.features.len() <= 20);

        // Candidates exist only outside the service disc.
        let facility = central_health_center().location();
        for feature in &report.recommendations.features {
            let distance = degree_distance(feature_point(feature), facility);
            assert!(
                distance >= 2.9 / 111.0,
                "recommendation {distance} degrees from the facility"
            );
        }

        // Under the uniform raster every sub-score saturates and all
        // candidates tie exactly, so the stable ranking surfaces the first
        // lattice point, out at the county corner and far from the central
        // facility.
        let top = feature_point(&report.recommendations.features[0]);
        assert!(
            degree_distance(top, facility) >= 12.0 / 111.0,
            "top site is only {} degrees out",
            degree_distance(top, facility)
        );

        let density = report.county_density.unwrap();
        assert!((density.mean - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_facilities_leave_everything_as_gap() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(100.0);
        let request = SuitabilityRequest {
            k: Some(5),
            ..SuitabilityRequest::for_type("Health Center")
        };

        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();

        assert!(report.coverage.coverage_percent.abs() < 1e-9);
        assert!(report.coverage.served_population.abs() < 1e-9);
        assert!(
            (report.coverage.gap_area_km2 - report.coverage.total_area_km2).abs()
                / report.coverage.total_area_km2
                < 1e-6
        );
        for ward in &report.coverage.wards {
            assert!(ward.served_population.abs() < 1e-9);
        }
        assert_eq!(report.recommendations.features.len(), 5);
    }

    #[test]
    fn nodata_raster_scores_without_raising() {
        let region = region(Vec::new());
        let mut raster = nodata_raster();
        let request = SuitabilityRequest {
            k: Some(3),
            ..SuitabilityRequest::for_type("Health Center")
        };

        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();

        assert!(report.county_density.is_none());
        assert!(!report.recommendations.features.is_empty());
        for feature in &report.recommendations.features {
            let properties = feature.properties.as_ref().unwrap();
            let served = properties
                .get("populationServed")
                .and_then(serde_json::Value::as_f64)
                .unwrap();
            assert!(served.abs() < f64::EPSILON);
            let composite = properties
                .get("compositeScore")
                .and_then(serde_json::Value::as_f64)
                .unwrap();
            assert!(composite.is_finite());
        }
    }

    #[test]
    fn mid_scoring_deadline_truncates_the_report() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(100.0);
        let request = SuitabilityRequest {
            k: Some(3),
            ..SuitabilityRequest::for_type("Health Center")
        };

        // Five checks: five candidates score, then the budget is spent.
        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::after_checks(5),
        )
        .unwrap();

        assert!(report.truncated);
        assert_eq!(report.candidates_evaluated, 5);
        assert!(report.candidates_evaluated < report.candidates_total);
        assert_eq!(report.candidates_scored, 5);
        assert!(!report.recommendations.features.is_empty());
        assert!(report.recommendations.features.len() <= 3);
    }

    #[test]
    fn scoring_window_carries_a_service_radius_margin() {
        let region = region(Vec::new());
        let mut raster = RecordingRaster {
            grid: uniform_raster(100.0).0,
            bounds_seen: None,
        };
        let request = SuitabilityRequest {
            k: Some(1),
            ..SuitabilityRequest::for_type("Health Center")
        };

        run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();

        // Edge candidates buffer past the boundary; the window must reach
        // one 3 km radius beyond it on every side.
        let seen = raster.bounds_seen.unwrap();
        let margin = 3.0 / KM_PER_DEGREE;
        assert!(seen.west <= 34.0 - margin + 1e-12);
        assert!(seen.south <= -SIDE_DEG - margin + 1e-12);
        assert!(seen.east >= 34.0 + SIDE_DEG + margin - 1e-12);
        assert!(seen.north >= margin - 1e-12);
    }

    #[test]
    fn expired_deadline_before_any_scoring_is_an_error() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(50.0);
        let request = SuitabilityRequest::for_type("Health Center");

        let result = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::after(Duration::ZERO),
        );
        assert!(matches!(result, Err(SuitabilityError::DeadlineExpired)));
    }

    #[test]
    fn empty_facility_type_is_rejected() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(50.0);
        let request = SuitabilityRequest::for_type("  ");

        let result = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        );
        assert!(matches!(
            result,
            Err(SuitabilityError::InvalidInput { .. })
        ));
    }

    #[test]
    fn clip_bounds_confine_the_recommendations() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(100.0);
        let west_half = BoundingBox::new(34.0, -SIDE_DEG, 34.0 + SIDE_DEG / 2.0, 0.0);
        let request = SuitabilityRequest {
            k: Some(10),
            bounds: Some(west_half),
            ..SuitabilityRequest::for_type("Health Center")
        };

        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();

        for feature in &report.recommendations.features {
            let point = feature_point(feature);
            assert!(point.x() < 34.0 + SIDE_DEG / 2.0 + 1e-9);
        }
    }

    #[test]
    fn disjoint_clip_bounds_are_invalid_input() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(100.0);
        let request = SuitabilityRequest {
            bounds: Some(BoundingBox::new(50.0, 10.0, 51.0, 11.0)),
            ..SuitabilityRequest::for_type("Health Center")
        };

        let result = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        );
        assert!(matches!(
            result,
            Err(SuitabilityError::InvalidInput { .. })
        ));
    }

    #[test]
    fn excluded_facility_types_do_not_contribute_coverage() {
        let mut pharmacy = central_health_center();
        pharmacy.facility_type = "Pharmacy".to_string();
        let region = region(vec![pharmacy]);
        let mut raster = uniform_raster(100.0);
        let request = SuitabilityRequest {
            k: Some(3),
            ..SuitabilityRequest::for_type("Health Center")
        };

        let report = run_suitability(
            &region,
            &mut raster,
            &dataset(),
            &config_3km(),
            &request,
            Deadline::none(),
        )
        .unwrap();
        assert!(report.coverage.coverage_percent.abs() < 1e-9);
    }

    #[test]
    fn area_density_report_distinguishes_nodata_from_zero() {
        let polygon = square_geom(34.01, -0.05, 0.05, 0.04);

        let mut valued = uniform_raster(100.0);
        let report = area_density_report(&mut valued, &dataset(), &polygon).unwrap();
        let stats = report.stats.unwrap();
        assert!((stats.mean - 100.0).abs() < 1e-9);
        assert!(report.estimated_population > 0.0);
        assert!(!report.approximate_area);

        let mut nodata = nodata_raster();
        let report = area_density_report(&mut nodata, &dataset(), &polygon).unwrap();
        assert!(report.stats.is_none());
        assert!(report.estimated_population.abs() < f64::EPSILON);
        assert!(report.area_km2 > 0.0);
    }

    #[test]
    fn density_surface_report_rejects_disjoint_bounds() {
        let region = region(Vec::new());
        let mut raster = uniform_raster(100.0);
        let far = BoundingBox::new(50.0, 10.0, 51.0, 11.0);
        let result =
            density_surface_report(&mut raster, &dataset(), &region.boundary, Some(&far));
        assert!(matches!(
            result,
            Err(SuitabilityError::InvalidInput { .. })
        ));

        let surface =
            density_surface_report(&mut raster, &dataset(), &region.boundary, None).unwrap();
        assert!(surface.point_count > 0);
        assert_eq!(surface.name, "test_density");
    }
}

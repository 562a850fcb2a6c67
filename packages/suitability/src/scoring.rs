//! Multi-factor candidate scoring.

use caresite_coverage::WardFootprint;
use caresite_geometry::{GeometryError, measure_area_km2, service_area};
use caresite_models::SitingConfig;
use caresite_raster::{DensityGrid, zonal_stats};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

/// Ward population at which the ward-population factor saturates.
const WARD_POPULATION_NORM: f64 = 50_000.0;

/// The density factor scores against this share of the county maximum, so
/// moderately dense corridors can still reach a full score.
const DENSITY_NORM_SHARE: f64 = 0.7;

/// The five normalized scoring factors, each clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    /// Estimated population served relative to the type's expectation.
    pub population: f64,
    /// Local mean density relative to the county-wide scale.
    pub density: f64,
    /// Coverage deficit of the containing ward.
    pub coverage: f64,
    /// Containing ward's population pressure.
    pub ward_population: f64,
    /// Peak density within the service area relative to the county maximum.
    pub accessibility: f64,
}

/// A candidate point with its factor breakdown and composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    /// Candidate longitude in WGS84 degrees.
    pub longitude: f64,
    /// Candidate latitude in WGS84 degrees.
    pub latitude: f64,
    /// Name of the containing ward, when one contains the point.
    pub ward: Option<String>,
    /// Estimated population within the service area (mean density × area).
    pub population_served: f64,
    /// Mean density over the service area; 0 when the raster held no data
    /// there.
    pub mean_density: f64,
    /// Service-area size in square kilometers.
    pub service_area_km2: f64,
    /// `true` when the area figure used the square-degree fallback.
    pub approximate_area: bool,
    /// Per-factor breakdown.
    pub scores: SubScores,
    /// Weighted sum of the sub-scores.
    pub composite_score: f64,
}

impl ScoredCandidate {
    /// The candidate location as a point in degree space.
    #[must_use]
    pub fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Why a single candidate was dropped from the batch.
#[derive(Debug, thiserror::Error)]
pub enum ScoreFailure {
    /// The service-area buffer could not be built or repaired.
    #[error("service area construction failed: {0}")]
    Buffer(#[from] GeometryError),
}

struct WardEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for WardEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-to-ward attribution index.
///
/// The R-tree only prefilters by envelope; exact containment decides, and
/// among several containing wards the one earliest in the supplied list wins.
/// Ward polygons are not guaranteed disjoint, so this first-match-in-stable-
/// order rule is what makes attribution deterministic.
pub struct WardIndex<'a> {
    footprints: &'a [WardFootprint],
    tree: RTree<WardEntry>,
}

impl<'a> WardIndex<'a> {
    /// Builds the index over the repaired ward footprints.
    #[must_use]
    pub fn new(footprints: &'a [WardFootprint]) -> Self {
        let entries = footprints
            .iter()
            .enumerate()
            .filter_map(|(index, footprint)| {
                footprint.geometry.bounding_rect().map(|rect| WardEntry {
                    index,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            footprints,
            tree: RTree::bulk_load(entries),
        }
    }

    /// The ward containing `point`, lowest original index winning.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<&'a WardFootprint> {
        let query = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|entry| self.footprints[entry.index].geometry.contains(&point))
            .map(|entry| entry.index)
            .min()
            .map(|index| &self.footprints[index])
    }
}

/// Everything candidate scoring reads, built once per analysis.
pub struct ScoringContext<'a> {
    config: &'a SitingConfig,
    radius_km: f64,
    expected_population: f64,
    ward_index: WardIndex<'a>,
    county_max_density: f64,
    grid: &'a DensityGrid,
}

impl<'a> ScoringContext<'a> {
    /// Assembles the context for scoring candidates of one facility type.
    #[must_use]
    pub fn new(
        config: &'a SitingConfig,
        facility_type: &str,
        ward_footprints: &'a [WardFootprint],
        county_max_density: f64,
        grid: &'a DensityGrid,
    ) -> Self {
        Self {
            config,
            radius_km: config.radius_km_for(facility_type),
            expected_population: config.expected_population_for(facility_type),
            ward_index: WardIndex::new(ward_footprints),
            county_max_density,
            grid,
        }
    }

    /// Service radius the candidates are scored at, in kilometers.
    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }
}

/// Scores one candidate point.
///
/// A no-data zonal result is not a failure: the raster-dependent quantities
/// and scores are 0, the ward-dependent ones still apply. A point outside
/// every ward scores 0 on the ward-dependent factors.
///
/// # Errors
///
/// * `ScoreFailure::Buffer` when the service-area polygon cannot be built;
///   the caller drops this candidate and continues the batch.
pub fn score_candidate(
    point: Point<f64>,
    ctx: &ScoringContext<'_>,
) -> Result<ScoredCandidate, ScoreFailure> {
    let buffer = service_area(point, ctx.radius_km)?;
    let zone = MultiPolygon::new(vec![buffer]);

    let stats = zonal_stats(ctx.grid, &zone);
    let measured = measure_area_km2(&zone);
    let (mean_density, peak_density) = stats.map_or((0.0, 0.0), |s| (s.mean, s.max));
    let population_served = mean_density * measured.km2;

    let ward = ctx.ward_index.locate(point);
    let (coverage, ward_population) = ward.map_or((0.0, 0.0), |w| {
        (
            (1.0 - w.served_fraction).clamp(0.0, 1.0),
            (w.population / WARD_POPULATION_NORM).clamp(0.0, 1.0),
        )
    });

    let density_norm = ctx.county_max_density * DENSITY_NORM_SHARE;
    let scores = SubScores {
        population: if ctx.expected_population > 0.0 {
            (population_served / ctx.expected_population).clamp(0.0, 1.0)
        } else {
            0.0
        },
        density: if density_norm > 0.0 {
            (mean_density / density_norm).clamp(0.0, 1.0)
        } else {
            0.0
        },
        coverage,
        ward_population,
        accessibility: if ctx.county_max_density > 0.0 {
            (peak_density / ctx.county_max_density).clamp(0.0, 1.0)
        } else {
            0.0
        },
    };

    let weights = ctx.config.score_weights;
    let composite_score = weights.population.mul_add(
        scores.population,
        weights.coverage.mul_add(
            scores.coverage,
            weights.ward_population.mul_add(
                scores.ward_population,
                weights
                    .density
                    .mul_add(scores.density, weights.accessibility * scores.accessibility),
            ),
        ),
    );

    Ok(ScoredCandidate {
        longitude: point.x(),
        latitude: point.y(),
        ward: ward.map(|w| w.name.clone()),
        population_served,
        mean_density,
        service_area_km2: measured.km2,
        approximate_area: measured.approximate,
        scores,
        composite_score,
    })
}

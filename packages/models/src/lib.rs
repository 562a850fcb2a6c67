#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference data types and the siting configuration.
//!
//! Facilities, administrative boundaries and raster metadata are read-only
//! inputs owned by an external store; everything the analysis derives from
//! them (buffers, candidates, coverage results) lives in the engine crates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

/// An existing healthcare facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Stable identifier from the source register.
    pub id: u64,
    /// Facility name.
    pub name: String,
    /// Category label (e.g. "Hospital", "Health Centre"). Open vocabulary,
    /// matched against the configuration tables.
    pub facility_type: String,
    /// Bed/cot capacity where the register records one.
    pub capacity: Option<u32>,
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
}

impl Facility {
    /// The facility location as a point in degree space.
    #[must_use]
    pub fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// A county-level administrative boundary with its population count.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// County name.
    pub name: String,
    /// Total resident population.
    pub population: f64,
    /// Boundary geometry in WGS84 degrees.
    pub geometry: MultiPolygon<f64>,
}

/// A ward (sub-county administrative unit) with its population count.
#[derive(Debug, Clone, PartialEq)]
pub struct Ward {
    /// Ward name.
    pub name: String,
    /// Parent sub-county, where the source data records one.
    pub subcounty: Option<String>,
    /// Resident population from the most recent census attribute.
    pub population: f64,
    /// Ward geometry in WGS84 degrees.
    pub geometry: MultiPolygon<f64>,
}

/// Metadata describing one population-density raster dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterDatasetInfo {
    /// Dataset name (e.g. "worldpop_kenya").
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Reference year of the estimates.
    pub year: i32,
    /// Path to the `GeoTIFF` file.
    pub path: PathBuf,
    /// Attribution / provider.
    pub source: Option<String>,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether all four edges are finite and the box has positive extent.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
            && self.west < self.east
            && self.south < self.north
    }

    /// The box grown by `margin` degrees on every side.
    #[must_use]
    pub const fn expanded(&self, margin: f64) -> Self {
        Self {
            west: self.west - margin,
            south: self.south - margin,
            east: self.east + margin,
            north: self.north + margin,
        }
    }

    /// The overlap of two boxes, or `None` when they do not intersect.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let west = self.west.max(other.west);
        let south = self.south.max(other.south);
        let east = self.east.min(other.east);
        let north = self.north.min(other.north);
        (west < east && south < north).then_some(Self::new(west, south, east, north))
    }
}

/// Weights applied to the five candidate sub-scores.
///
/// The defaults deliberately do not sum to 1.0; they are tuning knobs, not a
/// convex combination, and are applied exactly as configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeights {
    /// Weight of the population-served factor.
    pub population: f64,
    /// Weight of the ward-coverage-deficit factor.
    pub coverage: f64,
    /// Weight of the ward-population factor.
    pub ward_population: f64,
    /// Weight of the local-density factor.
    pub density: f64,
    /// Weight of the peak-density accessibility factor.
    pub accessibility: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            population: 0.35,
            coverage: 0.25,
            ward_population: 0.15,
            density: 0.20,
            accessibility: 0.15,
        }
    }
}

/// Externally supplied configuration for the analysis pipeline.
///
/// Facility-type tables fall back to the corresponding `default_*` value for
/// type labels they do not contain, so unknown categories degrade gracefully
/// instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SitingConfig {
    /// Service radius in kilometers per facility type.
    pub radius_by_type: BTreeMap<String, f64>,
    /// Fallback service radius in kilometers.
    pub default_radius_km: f64,
    /// Population a facility of each type is expected to serve.
    pub expected_population_by_type: BTreeMap<String, f64>,
    /// Fallback expected population.
    pub default_expected_population: f64,
    /// Sub-score weight vector.
    pub score_weights: ScoreWeights,
    /// Minimum separation between recommended sites, in kilometers, per type.
    pub min_separation_by_type: BTreeMap<String, f64>,
    /// Fallback minimum separation in kilometers.
    pub default_min_separation_km: f64,
    /// Facility categories excluded from the analysis (stand-alone
    /// pharmacies, labs and similar non-primary-care points).
    pub excluded_types: Vec<String>,
    /// Number of buffer geometries unioned per batch.
    pub union_batch_size: usize,
    /// Default number of sites to recommend.
    pub default_selection_size: usize,
    /// Separation threshold below which relaxation stops and remaining
    /// selections are forced, in kilometers.
    pub separation_floor_km: f64,
}

impl Default for SitingConfig {
    fn default() -> Self {
        Self {
            radius_by_type: BTreeMap::from([
                ("Hospital".to_string(), 10.0),
                ("Health Centre".to_string(), 5.0),
                ("Medical Clinic".to_string(), 3.0),
            ]),
            default_radius_km: 5.0,
            expected_population_by_type: BTreeMap::from([
                ("Hospital".to_string(), 100_000.0),
                ("Health Centre".to_string(), 30_000.0),
                ("Medical Clinic".to_string(), 10_000.0),
            ]),
            default_expected_population: 50_000.0,
            score_weights: ScoreWeights::default(),
            min_separation_by_type: BTreeMap::from([
                ("Hospital".to_string(), 10.0),
                ("Health Centre".to_string(), 5.0),
                ("Medical Clinic".to_string(), 3.0),
            ]),
            default_min_separation_km: 5.0,
            excluded_types: vec![
                "Dispensary".to_string(),
                "Pharmacy".to_string(),
                "VCT Centre (Stand-Alone)".to_string(),
                "Laboratory (Stand-alone)".to_string(),
                "Nursing Home".to_string(),
                "Health Programme".to_string(),
            ],
            union_batch_size: 50,
            default_selection_size: 20,
            separation_floor_km: 1.0,
        }
    }
}

impl SitingConfig {
    /// Service radius for the given facility type, in kilometers.
    #[must_use]
    pub fn radius_km_for(&self, facility_type: &str) -> f64 {
        self.radius_by_type
            .get(facility_type)
            .copied()
            .unwrap_or(self.default_radius_km)
    }

    /// Expected served population for the given facility type.
    #[must_use]
    pub fn expected_population_for(&self, facility_type: &str) -> f64 {
        self.expected_population_by_type
            .get(facility_type)
            .copied()
            .unwrap_or(self.default_expected_population)
    }

    /// Minimum separation between recommended sites of the given type, in
    /// kilometers.
    #[must_use]
    pub fn min_separation_km_for(&self, facility_type: &str) -> f64 {
        self.min_separation_by_type
            .get(facility_type)
            .copied()
            .unwrap_or(self.default_min_separation_km)
    }

    /// Whether the given facility category is excluded from analysis.
    #[must_use]
    pub fn is_excluded(&self, facility_type: &str) -> bool {
        self.excluded_types.iter().any(|t| t == facility_type)
    }
}

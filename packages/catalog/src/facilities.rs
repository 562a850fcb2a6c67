//! Facility stores.

use std::io::Read;
use std::path::{Path, PathBuf};

use caresite_models::Facility;
use serde::Deserialize;

use crate::{CatalogError, parse_collection, prop_f64, prop_str};

/// Read access to the facility register. Facilities are reference data,
/// owned and mutated elsewhere; the analysis only lists them.
pub trait FacilityStore {
    /// All facilities of the study region.
    ///
    /// # Errors
    ///
    /// * `CatalogError::NotFound` when the backing file does not exist.
    /// * `CatalogError::Parse` when its overall structure is unusable.
    fn list(&self) -> Result<Vec<Facility>, CatalogError>;
}

/// Facilities from a GeoJSON `FeatureCollection` of points.
pub struct GeoJsonFacilityStore {
    path: PathBuf,
}

impl GeoJsonFacilityStore {
    /// A store backed by the given file.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl FacilityStore for GeoJsonFacilityStore {
    fn list(&self) -> Result<Vec<Facility>, CatalogError> {
        let text = read_existing(&self.path)?;
        parse_facility_features(&text)
    }
}

fn read_existing(path: &Path) -> Result<String, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound {
            message: format!("no file at {}", path.display()),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

fn parse_facility_features(text: &str) -> Result<Vec<Facility>, CatalogError> {
    let collection = parse_collection(text)?;
    let mut facilities = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(location) = point_of(feature) else {
            log::warn!("skipping facility feature {index}: no point geometry");
            continue;
        };
        let Some(name) = prop_str(feature, &["name", "NAME", "Facility_N"]) else {
            log::warn!("skipping facility feature {index}: no name property");
            continue;
        };
        let facility_type = prop_str(feature, &["type", "facility_type", "Type"])
            .unwrap_or("Unknown")
            .to_string();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capacity = prop_f64(feature, &["capacity", "beds", "Beds"])
            .filter(|value| *value >= 0.0)
            .map(|value| value as u32);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let id = prop_f64(feature, &["id"]).map_or(index as u64, |value| value as u64);

        facilities.push(Facility {
            id,
            name: name.to_string(),
            facility_type,
            capacity,
            longitude: location.0,
            latitude: location.1,
        });
    }

    Ok(facilities)
}

fn point_of(feature: &geojson::Feature) -> Option<(f64, f64)> {
    match &feature.geometry.as_ref()?.value {
        geojson::Value::Point(coords) if coords.len() >= 2 => Some((coords[0], coords[1])),
        _ => None,
    }
}

/// One row of the national facility register export.
#[derive(Debug, Deserialize)]
struct RegisterRow {
    #[serde(rename = "County")]
    county: String,
    #[serde(rename = "Facility_N")]
    name: String,
    #[serde(rename = "Type")]
    facility_type: String,
    #[serde(rename = "Latitude")]
    latitude: String,
    #[serde(rename = "Longitude")]
    longitude: String,
}

/// Facilities from a CSV register export, filtered to one county.
///
/// Rows from other counties are ignored; rows with unparseable coordinates
/// are skipped with a warning.
pub struct CsvFacilityStore {
    path: PathBuf,
    county: String,
}

impl CsvFacilityStore {
    /// A store backed by the given register file, restricted to `county`
    /// (matched case-insensitively).
    #[must_use]
    pub fn new(path: &Path, county: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            county: county.to_string(),
        }
    }
}

impl FacilityStore for CsvFacilityStore {
    fn list(&self) -> Result<Vec<Facility>, CatalogError> {
        if !self.path.exists() {
            return Err(CatalogError::NotFound {
                message: format!("no file at {}", self.path.display()),
            });
        }
        let file = std::fs::File::open(&self.path)?;
        read_register(file, &self.county)
    }
}

fn read_register<R: Read>(input: R, county: &str) -> Result<Vec<Facility>, CatalogError> {
    let mut reader = csv::Reader::from_reader(input);
    let mut facilities = Vec::new();

    for (index, row) in reader.deserialize::<RegisterRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                log::warn!("skipping register row {}: {err}", index + 1);
                continue;
            }
        };
        if !row.county.trim().eq_ignore_ascii_case(county) {
            continue;
        }
        let (Ok(latitude), Ok(longitude)) = (
            row.latitude.trim().parse::<f64>(),
            row.longitude.trim().parse::<f64>(),
        ) else {
            log::warn!(
                "skipping register row {} ({}): unparseable coordinates",
                index + 1,
                row.name
            );
            continue;
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            log::warn!(
                "skipping register row {} ({}): non-finite coordinates",
                index + 1,
                row.name
            );
            continue;
        }

        facilities.push(Facility {
            id: facilities.len() as u64 + 1,
            name: row.name.trim().to_string(),
            facility_type: row.facility_type.trim().to_string(),
            capacity: None,
            longitude,
            latitude,
        });
    }

    log::info!("loaded {} facilities for county {county}", facilities.len());
    Ok(facilities)
}

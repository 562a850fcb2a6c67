//! Boundary stores.

use std::path::{Path, PathBuf};

use caresite_models::{Boundary, Ward};

use crate::{CatalogError, feature_multipolygon, parse_collection, prop_f64, prop_str};

/// Property keys tried for a county name, in order.
const COUNTY_KEYS: &[&str] = &["county", "COUNTY", "COUNTY_NAM", "name", "NAME"];
/// County attribution keys for ward features. Plain `name`/`NAME` are the
/// ward's own name there, so they must not be used as a county filter.
const WARD_COUNTY_KEYS: &[&str] = &["county", "COUNTY", "COUNTY_NAM"];
/// Property keys tried for a ward name.
const WARD_KEYS: &[&str] = &["ward", "WARD", "name", "NAME"];
/// Property keys tried for a population count.
const POPULATION_KEYS: &[&str] = &["population", "pop", "POP", "Population"];
/// Property keys tried for a parent sub-county.
const SUBCOUNTY_KEYS: &[&str] = &["subcounty", "sub_county", "SUBCOUNTY"];

/// Read access to administrative boundaries.
pub trait BoundaryStore {
    /// The county boundary for a region name.
    ///
    /// # Errors
    ///
    /// * `CatalogError::NotFound` when no boundary matches the region.
    /// * `CatalogError::Parse` when the backing file is unusable.
    fn county(&self, region: &str) -> Result<Boundary, CatalogError>;

    /// The ward polygons of a region.
    ///
    /// # Errors
    ///
    /// * `CatalogError::NotFound` when no ward matches the region.
    /// * `CatalogError::Parse` when the backing file is unusable.
    fn wards(&self, region: &str) -> Result<Vec<Ward>, CatalogError>;
}

/// Boundaries from a pair of GeoJSON files: one `FeatureCollection` of
/// counties and one of wards. Region names are matched case-insensitively
/// against the county property of each feature.
pub struct GeoJsonBoundaryStore {
    county_path: PathBuf,
    wards_path: PathBuf,
}

impl GeoJsonBoundaryStore {
    /// A store backed by the given county and ward files.
    #[must_use]
    pub fn new(county_path: &Path, wards_path: &Path) -> Self {
        Self {
            county_path: county_path.to_path_buf(),
            wards_path: wards_path.to_path_buf(),
        }
    }
}

impl BoundaryStore for GeoJsonBoundaryStore {
    fn county(&self, region: &str) -> Result<Boundary, CatalogError> {
        let collection = load_collection(&self.county_path)?;
        for (index, feature) in collection.features.iter().enumerate() {
            let Some(name) = prop_str(feature, COUNTY_KEYS) else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case(region) {
                continue;
            }
            let Some(geometry) = feature_multipolygon(feature) else {
                log::warn!("county feature {index} ({name}) has no polygon geometry");
                continue;
            };
            let population = prop_f64(feature, POPULATION_KEYS).unwrap_or_else(|| {
                log::warn!("county {name} has no population property; using 0");
                0.0
            });
            return Ok(Boundary {
                name: name.trim().to_string(),
                population,
                geometry,
            });
        }
        Err(CatalogError::NotFound {
            message: format!("no county boundary matches {region}"),
        })
    }

    fn wards(&self, region: &str) -> Result<Vec<Ward>, CatalogError> {
        let collection = load_collection(&self.wards_path)?;
        let mut wards = Vec::new();

        for (index, feature) in collection.features.iter().enumerate() {
            // Ward files may cover the whole country; keep a feature when it
            // names our county, or carries no county attribute at all.
            if let Some(county) = prop_str(feature, WARD_COUNTY_KEYS) {
                if !county.trim().eq_ignore_ascii_case(region) {
                    continue;
                }
            }
            let Some(name) = prop_str(feature, WARD_KEYS) else {
                log::warn!("skipping ward feature {index}: no name property");
                continue;
            };
            let Some(geometry) = feature_multipolygon(feature) else {
                log::warn!("skipping ward {name}: no polygon geometry");
                continue;
            };
            let population = prop_f64(feature, POPULATION_KEYS).unwrap_or(0.0);
            wards.push(Ward {
                name: name.trim().to_string(),
                subcounty: prop_str(feature, SUBCOUNTY_KEYS).map(|s| s.trim().to_string()),
                population,
                geometry,
            });
        }

        if wards.is_empty() {
            return Err(CatalogError::NotFound {
                message: format!("no wards match {region}"),
            });
        }
        log::info!("loaded {} wards for {region}", wards.len());
        Ok(wards)
    }
}

fn load_collection(path: &Path) -> Result<geojson::FeatureCollection, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound {
            message: format!("no file at {}", path.display()),
        });
    }
    parse_collection(&std::fs::read_to_string(path)?)
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference-data stores.
//!
//! The analysis engines consume facilities, boundaries and raster metadata
//! through the traits here; the file-backed implementations read GeoJSON
//! boundary files, facility registers (GeoJSON or CSV) and a directory of
//! density `GeoTIFF`s. Malformed individual records are skipped with a
//! logged warning; missing files or regions are a not-found condition.

pub mod boundaries;
pub mod facilities;
pub mod rasters;

use geo::MultiPolygon;

pub use boundaries::{BoundaryStore, GeoJsonBoundaryStore};
pub use facilities::{CsvFacilityStore, FacilityStore, GeoJsonFacilityStore};
pub use rasters::{DirectoryRasterCatalog, RasterCatalog};

/// Errors from reference-data access.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The requested file, region or dataset does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// What was missing.
        message: String,
    },

    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file's overall structure is unusable (as opposed to a single bad
    /// record, which is skipped).
    #[error("Parse error: {message}")]
    Parse {
        /// Diagnostic for the caller.
        message: String,
    },

    /// CSV structure could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Converts a GeoJSON feature's geometry into a multipolygon, accepting
/// both `Polygon` and `MultiPolygon` geometry types.
pub(crate) fn feature_multipolygon(feature: &geojson::Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.as_ref()?;
    let parsed: geo::Geometry<f64> = geo::Geometry::try_from(geometry.value.clone()).ok()?;
    match parsed {
        geo::Geometry::MultiPolygon(multi) => Some(multi),
        geo::Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        _ => None,
    }
}

/// First string property present under any of the given keys.
pub(crate) fn prop_str<'a>(feature: &'a geojson::Feature, keys: &[&str]) -> Option<&'a str> {
    let properties = feature.properties.as_ref()?;
    keys.iter()
        .find_map(|key| properties.get(*key).and_then(serde_json::Value::as_str))
}

/// First numeric property present under any of the given keys; numeric
/// strings are tolerated since exported attribute tables often carry them.
pub(crate) fn prop_f64(feature: &geojson::Feature, keys: &[&str]) -> Option<f64> {
    let properties = feature.properties.as_ref()?;
    keys.iter().find_map(|key| {
        let value = properties.get(*key)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|raw| raw.trim().parse().ok()))
    })
}

/// Parses a GeoJSON `FeatureCollection` document.
pub(crate) fn parse_collection(text: &str) -> Result<geojson::FeatureCollection, CatalogError> {
    let geojson: geojson::GeoJson = text.parse().map_err(|err| CatalogError::Parse {
        message: format!("invalid GeoJSON: {err}"),
    })?;
    match geojson {
        geojson::GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(CatalogError::Parse {
            message: "expected a FeatureCollection".to_string(),
        }),
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `caresite` command line.
//!
//! Runs the coverage, suitability and density analyses over an on-disk data
//! directory and prints the wire-level JSON reports to stdout. The expected
//! layout is `county.geojson`, `wards.geojson`, `facilities.geojson` or
//! `facilities.csv`, and a `rasters/` directory of density `GeoTIFF`s.

use std::path::{Path, PathBuf};
use std::time::Duration;

use caresite_catalog::{
    BoundaryStore, CatalogError, CsvFacilityStore, DirectoryRasterCatalog, FacilityStore,
    GeoJsonBoundaryStore, GeoJsonFacilityStore, RasterCatalog,
};
use caresite_coverage::compute_coverage;
use caresite_models::{BoundingBox, RasterDatasetInfo, SitingConfig};
use caresite_raster::RasterSource;
use caresite_suitability::{
    Deadline, RegionData, SuitabilityError, SuitabilityRequest, density_surface_report,
    run_suitability,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "caresite", about = "Healthcare facility siting analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute current service coverage for a region
    Coverage {
        /// Data directory
        #[arg(long)]
        data: PathBuf,
        /// County name
        #[arg(long)]
        region: String,
        /// Optional `SitingConfig` JSON overriding the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Recommend new facility sites
    Suitability {
        /// Data directory
        #[arg(long)]
        data: PathBuf,
        /// County name
        #[arg(long)]
        region: String,
        /// Facility type to site
        #[arg(long)]
        facility_type: String,
        /// Number of sites to recommend
        #[arg(long)]
        k: Option<usize>,
        /// Time budget for the analysis in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Optional `SitingConfig` JSON overriding the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Export a downsampled density surface
    Density {
        /// Data directory
        #[arg(long)]
        data: PathBuf,
        /// County name
        #[arg(long)]
        region: String,
        /// Window as `west,south,east,north` degrees
        #[arg(long)]
        bounds: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Coverage {
            data,
            region,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let region_data = load_region(&data, &region)?;
            let outcome = compute_coverage(
                &analysis_set(&region_data, &config),
                &region_data.boundary,
                &region_data.wards,
                &config,
            )?;
            print_json(&outcome.result)
        }
        Commands::Suitability {
            data,
            region,
            facility_type,
            k,
            timeout_secs,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let region_data = load_region(&data, &region)?;
            let dataset = latest_dataset(&data)?;
            let mut raster = RasterSource::open(&dataset.path)?;
            let request = SuitabilityRequest {
                k,
                ..SuitabilityRequest::for_type(&facility_type)
            };
            let deadline =
                timeout_secs.map_or_else(Deadline::none, |secs| {
                    Deadline::after(Duration::from_secs(secs))
                });
            let report = run_suitability(
                &region_data,
                &mut raster,
                &dataset,
                &config,
                &request,
                deadline,
            )?;
            print_json(&report)
        }
        Commands::Density {
            data,
            region,
            bounds,
        } => {
            let region_data = load_region(&data, &region)?;
            let dataset = latest_dataset(&data)?;
            let mut raster = RasterSource::open(&dataset.path)?;
            let bounds = bounds.as_deref().map(parse_bounds).transpose()?;
            let surface = density_surface_report(
                &mut raster,
                &dataset,
                &region_data.boundary,
                bounds.as_ref(),
            )?;
            print_json(&surface)
        }
    }
}

/// Maps a catalog failure onto the analysis error taxonomy: a missing file,
/// region or dataset is the data-unavailable condition.
fn data_error(err: CatalogError) -> SuitabilityError {
    match err {
        CatalogError::NotFound { message } => SuitabilityError::DataUnavailable { message },
        other => SuitabilityError::InvalidInput {
            message: other.to_string(),
        },
    }
}

fn load_region(data: &Path, region: &str) -> Result<RegionData, SuitabilityError> {
    let boundaries =
        GeoJsonBoundaryStore::new(&data.join("county.geojson"), &data.join("wards.geojson"));
    let boundary = boundaries.county(region).map_err(data_error)?;
    let wards = boundaries.wards(region).map_err(data_error)?;

    let geojson_path = data.join("facilities.geojson");
    let facilities = if geojson_path.exists() {
        GeoJsonFacilityStore::new(&geojson_path).list()
    } else {
        CsvFacilityStore::new(&data.join("facilities.csv"), region).list()
    }
    .map_err(data_error)?;
    log::info!(
        "loaded {} facilities, {} wards for {region}",
        facilities.len(),
        wards.len()
    );

    Ok(RegionData {
        facilities,
        boundary,
        wards,
    })
}

fn latest_dataset(data: &Path) -> Result<RasterDatasetInfo, SuitabilityError> {
    DirectoryRasterCatalog::new(&data.join("rasters"))
        .latest()
        .map_err(data_error)
}

fn load_config(path: Option<&Path>) -> Result<SitingConfig, Box<dyn std::error::Error>> {
    match path {
        None => Ok(SitingConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

/// The facilities that participate in analysis, with excluded categories
/// filtered out.
fn analysis_set(
    region: &RegionData,
    config: &SitingConfig,
) -> Vec<caresite_models::Facility> {
    region
        .facilities
        .iter()
        .filter(|facility| !config.is_excluded(&facility.facility_type))
        .cloned()
        .collect()
}

fn parse_bounds(raw: &str) -> Result<BoundingBox, SuitabilityError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| SuitabilityError::InvalidInput {
            message: format!("bounds must be four numbers, got {raw}"),
        })?;
    let [west, south, east, north] = parts[..] else {
        return Err(SuitabilityError::InvalidInput {
            message: format!("bounds must be west,south,east,north, got {raw}"),
        });
    };
    let bounds = BoundingBox::new(west, south, east, north);
    if !bounds.is_well_formed() {
        return Err(SuitabilityError::InvalidInput {
            message: format!("bounds are malformed: {raw}"),
        });
    }
    Ok(bounds)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

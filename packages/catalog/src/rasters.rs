//! The density-raster catalog.

use std::path::{Path, PathBuf};

use caresite_models::RasterDatasetInfo;

use crate::CatalogError;

/// Read access to the density-raster datasets of the study region.
pub trait RasterCatalog {
    /// The most recent dataset, by reference year.
    ///
    /// # Errors
    ///
    /// * `CatalogError::NotFound` when no dataset exists.
    fn latest(&self) -> Result<RasterDatasetInfo, CatalogError>;
}

/// Datasets from a directory of `<name>_<year>.tif` files.
pub struct DirectoryRasterCatalog {
    dir: PathBuf,
}

impl DirectoryRasterCatalog {
    /// A catalog over the given directory.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Every recognized dataset in the directory, unordered.
    ///
    /// # Errors
    ///
    /// * `CatalogError::NotFound` when the directory does not exist.
    pub fn list(&self) -> Result<Vec<RasterDatasetInfo>, CatalogError> {
        if !self.dir.is_dir() {
            return Err(CatalogError::NotFound {
                message: format!("no raster directory at {}", self.dir.display()),
            });
        }
        let mut datasets = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(dataset) = dataset_from_path(&path) {
                datasets.push(dataset);
            }
        }
        Ok(datasets)
    }
}

impl RasterCatalog for DirectoryRasterCatalog {
    fn latest(&self) -> Result<RasterDatasetInfo, CatalogError> {
        self.list()?
            .into_iter()
            .max_by(|a, b| a.year.cmp(&b.year).then_with(|| a.name.cmp(&b.name)))
            .ok_or_else(|| CatalogError::NotFound {
                message: format!("no raster datasets in {}", self.dir.display()),
            })
    }
}

/// Parses `<name>_<year>.tif` into dataset metadata; anything else is not a
/// dataset.
fn dataset_from_path(path: &Path) -> Option<RasterDatasetInfo> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case("tif") && !extension.eq_ignore_ascii_case("tiff") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (name, year_text) = stem.rsplit_once('_')?;
    let year: i32 = year_text.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some(RasterDatasetInfo {
        name: name.to_string(),
        description: None,
        year,
        path: path.to_path_buf(),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_names_parse_name_and_year() {
        let dataset = dataset_from_path(Path::new("/data/worldpop_kenya_2020.tif")).unwrap();
        assert_eq!(dataset.name, "worldpop_kenya");
        assert_eq!(dataset.year, 2020);

        let dataset = dataset_from_path(Path::new("density_2015.TIFF")).unwrap();
        assert_eq!(dataset.name, "density");
        assert_eq!(dataset.year, 2015);
    }

    #[test]
    fn non_dataset_files_are_ignored() {
        assert!(dataset_from_path(Path::new("readme.txt")).is_none());
        assert!(dataset_from_path(Path::new("noyear.tif")).is_none());
        assert!(dataset_from_path(Path::new("density_notayear.tif")).is_none());
        assert!(dataset_from_path(Path::new("_2020.tif")).is_none());
    }

    #[test]
    fn latest_picks_the_newest_year() {
        let dir = std::env::temp_dir().join(format!("caresite-rasters-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "worldpop_kenya_2018.tif",
            "worldpop_kenya_2020.tif",
            "worldpop_kenya_2015.tif",
            "notes.md",
        ] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let catalog = DirectoryRasterCatalog::new(&dir);
        let latest = catalog.latest().unwrap();
        assert_eq!(latest.year, 2020);
        assert_eq!(latest.name, "worldpop_kenya");
        assert_eq!(catalog.list().unwrap().len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_directory_is_not_found() {
        let dir = std::env::temp_dir().join(format!("caresite-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let catalog = DirectoryRasterCatalog::new(&dir);
        assert!(matches!(
            catalog.latest(),
            Err(CatalogError::NotFound { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();

        let missing = DirectoryRasterCatalog::new(Path::new("/nonexistent/rasters"));
        assert!(matches!(
            missing.latest(),
            Err(CatalogError::NotFound { .. })
        ));
    }
}

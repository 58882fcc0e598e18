use std::fs::{self, File};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{GeoProduct, PolarProduct, TemporalWindow};
use crate::error::CoregError;
use crate::manifest::manifest_file_name;

/// Layout of one run's save directory.
///
/// ```text
/// <root>/modis/{L1b,CM,FM}/
/// <root>/msg/{L1b,CM}/
/// <root>/msg-<product>-timestamps_<start>_<end>.csv
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn modis_dir(&self) -> Utf8PathBuf {
        self.root.join("modis")
    }

    pub fn msg_dir(&self) -> Utf8PathBuf {
        self.root.join("msg")
    }

    pub fn polar_product_dir(&self, product: PolarProduct) -> Utf8PathBuf {
        self.modis_dir().join(product.subdir())
    }

    pub fn geo_product_dir(&self, product: GeoProduct) -> Utf8PathBuf {
        self.msg_dir().join(product.subdir())
    }

    pub fn manifest_path(&self, product: &str, window: &TemporalWindow) -> Utf8PathBuf {
        self.root.join(manifest_file_name(
            product,
            window.start_date(),
            window.end_date(),
        ))
    }

    pub fn ensure_modis_dir(&self) -> Result<(), CoregError> {
        ensure_dir(self.modis_dir().as_std_path())
    }

    pub fn ensure_msg_dir(&self) -> Result<(), CoregError> {
        ensure_dir(self.msg_dir().as_std_path())
    }
}

/// Creates `path` and its parents; an existing directory is fine.
pub fn ensure_dir(path: &Path) -> Result<(), CoregError> {
    fs::create_dir_all(path)
        .map_err(|err| CoregError::Filesystem(format!("create {}: {err}", path.display())))
}

/// Fills a temporary file next to `path`, then moves it into place, replacing
/// whatever was there. A failed `fill` leaves `path` untouched.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<(), CoregError>
where
    F: FnOnce(&mut File) -> Result<(), CoregError>,
{
    let parent = path
        .parent()
        .ok_or_else(|| CoregError::Filesystem(format!("invalid destination: {}", path.display())))?;
    ensure_dir(parent)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".msg-coreg")
        .tempfile_in(parent)
        .map_err(|err| CoregError::Filesystem(err.to_string()))?;
    fill(temp.as_file_mut())?;
    temp.persist(path)
        .map_err(|err| CoregError::Filesystem(err.to_string()))?;
    Ok(())
}

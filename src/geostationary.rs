use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::{GeoProduct, Instant};
use crate::error::CoregError;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoRequest {
    pub product: GeoProduct,
    pub satellite: &'static str,
    pub instrument: &'static str,
    pub processing_level: &'static str,
    pub timestamps: Vec<Instant>,
    pub save_dir: PathBuf,
}

/// Fetches the scan nearest each requested instant.
///
/// Returns the saved paths and, index for index, the requested instant each path was
/// matched against. Instants without a scan are left out of both lists.
pub trait GeoTransport: Send + Sync {
    fn download(&self, request: &GeoRequest) -> Result<(Vec<PathBuf>, Vec<Instant>), CoregError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoDownload {
    pub files: Vec<PathBuf>,
    pub queries: Vec<Instant>,
    pub requested: usize,
}

impl GeoDownload {
    pub fn is_aligned(&self) -> bool {
        self.files.len() == self.queries.len()
    }

    /// Requested instants the transport found no scan for.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.files.len())
    }
}

/// MSG/SEVIRI downloader driven by an explicit list of instants rather than a window.
pub struct MsgDownloader<'a, T: GeoTransport> {
    transport: &'a T,
    timestamps: Vec<Instant>,
    store: &'a Store,
}

impl<'a, T: GeoTransport> MsgDownloader<'a, T> {
    pub fn new(transport: &'a T, timestamps: Vec<Instant>, store: &'a Store) -> Self {
        Self {
            transport,
            timestamps,
            store,
        }
    }

    pub fn request(&self, product: GeoProduct) -> GeoRequest {
        GeoRequest {
            product,
            satellite: product.satellite(),
            instrument: product.instrument(),
            processing_level: product.processing_level(),
            timestamps: self.timestamps.clone(),
            save_dir: self.store.geo_product_dir(product).into_std_path_buf(),
        }
    }

    pub fn download(&self, product: GeoProduct) -> Result<GeoDownload, CoregError> {
        if self.timestamps.is_empty() {
            return Ok(GeoDownload::default());
        }
        let request = self.request(product);
        info!(
            instrument = request.instrument,
            requested = self.timestamps.len(),
            "downloading {product}"
        );
        let (files, queries) = self.transport.download(&request)?;
        let result = GeoDownload {
            files,
            queries,
            requested: self.timestamps.len(),
        };
        if !result.is_aligned() {
            warn!(
                files = result.files.len(),
                queries = result.queries.len(),
                "{product}: transport returned unpaired results"
            );
        }
        if result.shortfall() > 0 {
            warn!(
                matched = result.files.len(),
                requested = result.requested,
                "{product}: no scan found for {} requested instants",
                result.shortfall()
            );
        }
        Ok(result)
    }

    pub fn download_base(&self) -> Result<GeoDownload, CoregError> {
        self.download(GeoProduct::Base)
    }

    pub fn download_cloud_mask(&self) -> Result<GeoDownload, CoregError> {
        self.download(GeoProduct::CloudMask)
    }
}

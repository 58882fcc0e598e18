use std::path::PathBuf;

use tracing::info;

use crate::domain::{BoundingBox, PolarProduct, PolarSatellite, TemporalWindow};
use crate::error::CoregError;
use crate::store::Store;

/// Everything a transport needs to fetch one MODIS product for one satellite.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarRequest {
    pub satellite: PolarSatellite,
    pub product: PolarProduct,
    pub short_name: String,
    pub identifier: &'static str,
    pub processing_level: &'static str,
    pub resolution: &'static str,
    pub window: TemporalWindow,
    pub bbox: BoundingBox,
    pub day_step: u32,
    pub save_dir: PathBuf,
}

/// Downloads the granules described by a [`PolarRequest`] and returns the saved paths.
///
/// Implementations must apply the request's time-of-day range on every day of its
/// date range.
pub trait PolarTransport: Send + Sync {
    fn download(&self, request: &PolarRequest) -> Result<Vec<PathBuf>, CoregError>;
}

/// Maps a MODIS product name onto its platform. `MYD*` is Aqua, `MOD*` is Terra.
pub fn select(product_name: &str) -> Result<PolarSatellite, CoregError> {
    if product_name.starts_with(PolarSatellite::Aqua.prefix()) {
        Ok(PolarSatellite::Aqua)
    } else if product_name.starts_with(PolarSatellite::Terra.prefix()) {
        Ok(PolarSatellite::Terra)
    } else {
        Err(CoregError::UnknownProduct(product_name.to_string()))
    }
}

pub struct PolarDownloader<'a, T: PolarTransport> {
    transport: &'a T,
    satellite: PolarSatellite,
    window: TemporalWindow,
    bbox: BoundingBox,
    store: &'a Store,
}

impl<'a, T: PolarTransport> PolarDownloader<'a, T> {
    pub fn new(
        transport: &'a T,
        satellite: PolarSatellite,
        window: TemporalWindow,
        bbox: BoundingBox,
        store: &'a Store,
    ) -> Self {
        Self {
            transport,
            satellite,
            window,
            bbox,
            store,
        }
    }

    /// Selects the platform from `product_name` and builds its downloader.
    pub fn for_product(
        product_name: &str,
        transport: &'a T,
        window: TemporalWindow,
        bbox: BoundingBox,
        store: &'a Store,
    ) -> Result<Self, CoregError> {
        let satellite = select(product_name)?;
        Ok(Self::new(transport, satellite, window, bbox, store))
    }

    pub fn satellite(&self) -> PolarSatellite {
        self.satellite
    }

    pub fn request(&self, product: PolarProduct) -> PolarRequest {
        PolarRequest {
            satellite: self.satellite,
            product,
            short_name: product.short_name(self.satellite),
            identifier: product.identifier(),
            processing_level: product.processing_level(),
            resolution: product.resolution(),
            window: self.window,
            bbox: self.bbox,
            day_step: 1,
            save_dir: self.store.polar_product_dir(product).into_std_path_buf(),
        }
    }

    pub fn ensure_supported(&self, product: PolarProduct) -> Result<(), CoregError> {
        if self.satellite.supports(product) {
            Ok(())
        } else {
            Err(CoregError::UnsupportedProduct {
                satellite: self.satellite.to_string(),
                product: product.to_string(),
            })
        }
    }

    pub fn download(&self, product: PolarProduct) -> Result<Vec<PathBuf>, CoregError> {
        self.ensure_supported(product)?;
        let request = self.request(product);
        info!(
            satellite = %self.satellite,
            short_name = %request.short_name,
            "downloading MODIS {product}"
        );
        let files = self.transport.download(&request)?;
        info!(count = files.len(), "MODIS {product} files ready");
        Ok(files)
    }

    /// Level-1b calibrated radiances at 1 km, under `L1b/`.
    pub fn download_base(&self) -> Result<Vec<PathBuf>, CoregError> {
        self.download(PolarProduct::Base)
    }

    /// Level-2 cloud mask, under `CM/`.
    pub fn download_cloud_mask(&self) -> Result<Vec<PathBuf>, CoregError> {
        self.download(PolarProduct::CloudMask)
    }

    pub fn download_fire_mask(&self) -> Result<Vec<PathBuf>, CoregError> {
        self.download(PolarProduct::FireMask)
    }
}

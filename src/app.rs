use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::catalog::{CatalogClient, CatalogQuery, Session, overpass_timestamps};
use crate::config::ResolvedConfig;
use crate::domain::{PolarProduct, format_instant};
use crate::error::CoregError;
use crate::geostationary::{GeoDownload, GeoTransport, MsgDownloader};
use crate::manifest::{CloudMaskInputs, ManifestBuilder};
use crate::naming::MsgFileNames;
use crate::polar::{PolarDownloader, PolarTransport};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModisFiles {
    pub base: Vec<String>,
    pub cloud_mask: Option<Vec<String>>,
    pub fire_mask: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MsgFiles {
    pub base: Vec<String>,
    pub base_unmatched: usize,
    pub cloud_mask: Option<Vec<String>>,
    pub cloud_mask_unmatched: usize,
    pub cloud_mask_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub product: String,
    pub satellite: String,
    pub granules: usize,
    pub overpasses: Vec<String>,
    pub modis: ModisFiles,
    pub msg: MsgFiles,
    pub manifest_path: Option<String>,
    pub manifest_rows: usize,
    pub cloud_mask_columns: bool,
    pub cloud_mask_skipped: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub authenticated: bool,
    pub method: Option<String>,
}

/// Co-registration run: MODIS overpasses, polar downloads, nearest MSG scans, manifest.
#[derive(Clone)]
pub struct App<S: Session, C: CatalogClient, P: PolarTransport, G: GeoTransport> {
    session: S,
    catalog: C,
    polar: P,
    geo: G,
}

impl<S: Session, C: CatalogClient, P: PolarTransport, G: GeoTransport> App<S, C, P, G> {
    pub fn new(session: S, catalog: C, polar: P, geo: G) -> Self {
        Self {
            session,
            catalog,
            polar,
            geo,
        }
    }

    pub fn run(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, CoregError> {
        let store = config.store();

        emit(sink, "phase=Auth; checking Earthdata session");
        let catalog = CatalogQuery::new(&self.session, &self.catalog);
        catalog.ensure_authenticated()?;

        emit(
            sink,
            format!("phase=Query; MODIS {} overpasses", config.product),
        );
        let start = std::time::Instant::now();
        let granules = catalog.query(&config.product, &config.bbox, &config.window)?;
        sink.event(ProgressEvent {
            message: format!("catalog.response granules={}", granules.len()),
            elapsed: Some(start.elapsed()),
        });
        info!(
            count = granules.len(),
            product = %config.product,
            "found MODIS granules for the region and period"
        );
        let timestamps = overpass_timestamps(&granules)?;

        // Selection and capability checks happen before anything is written.
        let downloader = PolarDownloader::for_product(
            &config.product,
            &self.polar,
            config.window,
            config.bbox,
            &store,
        )?;
        if config.fire_mask {
            downloader.ensure_supported(PolarProduct::FireMask)?;
        }
        let satellite = downloader.satellite();

        store.ensure_modis_dir()?;
        emit(sink, format!("phase=Download; {satellite}/MODIS base"));
        let mut modis = ModisFiles {
            base: path_strings(&downloader.download_base()?),
            ..Default::default()
        };
        if config.cloud_mask {
            emit(sink, format!("phase=Download; {satellite}/MODIS cloud mask"));
            modis.cloud_mask = Some(path_strings(&downloader.download_cloud_mask()?));
        }
        if config.fire_mask {
            emit(sink, format!("phase=Download; {satellite}/MODIS fire mask"));
            modis.fire_mask = Some(path_strings(&downloader.download_fire_mask()?));
        }

        store.ensure_msg_dir()?;
        let msg_downloader = MsgDownloader::new(&self.geo, timestamps.clone(), &store);
        emit(sink, "phase=Download; MSG base");
        let msg_base = msg_downloader.download_base()?;
        let mut msg = MsgFiles {
            base: path_strings(&msg_base.files),
            base_unmatched: msg_base.shortfall(),
            ..Default::default()
        };

        let msg_cloud_mask = if config.cloud_mask {
            emit(sink, "phase=Download; MSG cloud mask");
            match msg_downloader.download_cloud_mask() {
                Ok(result) => {
                    msg.cloud_mask = Some(path_strings(&result.files));
                    msg.cloud_mask_unmatched = result.shortfall();
                    Some(result)
                }
                Err(err) => {
                    error!("MSG cloud mask download failed: {err}");
                    msg.cloud_mask_error = Some(err.to_string());
                    None
                }
            }
        } else {
            None
        };

        emit(sink, "phase=Manifest; pairing timestamps");
        let builder = ManifestBuilder::new(MsgFileNames);
        let manifest = builder.build(
            &timestamps,
            &msg_base.files,
            &msg_base.queries,
            msg_cloud_mask.as_ref().map(cloud_mask_inputs),
        )?;

        let mut report = RunReport {
            product: config.product.clone(),
            satellite: satellite.to_string(),
            granules: granules.len(),
            overpasses: timestamps.iter().map(format_instant).collect(),
            modis,
            msg,
            manifest_path: None,
            manifest_rows: 0,
            cloud_mask_columns: false,
            cloud_mask_skipped: None,
        };

        if let Some(manifest) = manifest {
            let path = store.manifest_path(&config.product, &config.window);
            emit(sink, format!("phase=Store; writing {path}"));
            manifest.write(path.as_std_path())?;
            report.manifest_path = Some(path.to_string());
            report.manifest_rows = manifest.rows.len();
            report.cloud_mask_columns = manifest.has_cloud_mask();
            report.cloud_mask_skipped = manifest.cloud_mask_skipped;
        }

        info!("finished co-registration run");
        Ok(report)
    }
}

fn cloud_mask_inputs(download: &GeoDownload) -> CloudMaskInputs<'_> {
    CloudMaskInputs {
        files: &download.files,
        queries: &download.queries,
    }
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|path| path.display().to_string()).collect()
}

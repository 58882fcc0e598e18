use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CoregError {
    #[error("no Earthdata session: set EARTHDATA_TOKEN or add urs.earthdata.nasa.gov to ~/.netrc")]
    Authentication,

    #[error("unknown MODIS product {0}: expected a MYD (Aqua) or MOD (Terra) prefix")]
    UnknownProduct(String),

    #[error("unrecognized granule identifier: {0}")]
    MalformedIdentifier(String),

    #[error("unrecognized MSG file name: {0}")]
    MalformedFilename(String),

    #[error("{product}: {files} downloaded files against {queries} query timestamps")]
    Reconciliation {
        product: String,
        files: usize,
        queries: usize,
    },

    #[error("{satellite} has no {product} product")]
    UnsupportedProduct { satellite: String, product: String },

    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("invalid time of day (expected HH:MM:SS): {0}")]
    InvalidTime(String),

    #[error("invalid temporal window: {0}")]
    InvalidWindow(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("CMR request failed: {0}")]
    CmrHttp(String),

    #[error("CMR returned status {status}: {message}")]
    CmrStatus { status: u16, message: String },

    #[error("EUMETSAT request failed: {0}")]
    EumetsatHttp(String),

    #[error("EUMETSAT returned status {status}: {message}")]
    EumetsatStatus { status: u16, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to write manifest: {0}")]
    ManifestWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

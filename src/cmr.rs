use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{CatalogClient, Session};
use crate::domain::{BoundingBox, Instant};
use crate::error::CoregError;
use crate::polar::{PolarRequest, PolarTransport};
use crate::store::{ensure_dir, write_atomic};

pub const EARTHDATA_HOST: &str = "urs.earthdata.nasa.gov";
pub const EARTHDATA_TOKEN_VAR: &str = "EARTHDATA_TOKEN";

const CMR_GRANULES_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";
const PAGE_SIZE: usize = 200;
const CMR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DATA_REL_SUFFIX: &str = "/data#";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarthdataCredentials {
    Token(String),
    Login { login: String, password: String },
}

/// Earthdata Login state: a bearer token from `EARTHDATA_TOKEN`, or the
/// `urs.earthdata.nasa.gov` entry of `~/.netrc`.
#[derive(Debug, Clone, Default)]
pub struct EarthdataSession {
    credentials: Option<EarthdataCredentials>,
}

impl EarthdataSession {
    pub fn new(credentials: Option<EarthdataCredentials>) -> Self {
        Self { credentials }
    }

    pub fn from_env() -> Self {
        if let Ok(token) = std::env::var(EARTHDATA_TOKEN_VAR) {
            if !token.trim().is_empty() {
                return Self::new(Some(EarthdataCredentials::Token(token.trim().to_string())));
            }
        }
        let credentials = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".netrc"))
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| parse_netrc(&content, EARTHDATA_HOST));
        Self::new(credentials)
    }

    pub fn credentials(&self) -> Option<&EarthdataCredentials> {
        self.credentials.as_ref()
    }

    pub fn method(&self) -> Option<&'static str> {
        match self.credentials {
            Some(EarthdataCredentials::Token(_)) => Some("token"),
            Some(EarthdataCredentials::Login { .. }) => Some("netrc"),
            None => None,
        }
    }
}

impl Session for EarthdataSession {
    fn authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Finds `machine <host> login <l> password <p>` in netrc content.
pub fn parse_netrc(content: &str, host: &str) -> Option<EarthdataCredentials> {
    let mut tokens = content.split_whitespace();
    let mut in_host = false;
    let mut login = None;
    let mut password = None;
    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                if in_host {
                    break;
                }
                in_host = tokens.next() == Some(host);
            }
            "default" => {
                if in_host {
                    break;
                }
            }
            "login" if in_host => login = tokens.next().map(str::to_string),
            "password" if in_host => password = tokens.next().map(str::to_string),
            _ => {}
        }
    }
    Some(EarthdataCredentials::Login {
        login: login?,
        password: password?,
    })
}

#[derive(Debug, Deserialize)]
struct GranuleFeed {
    feed: FeedBody,
}

#[derive(Debug, Deserialize)]
struct FeedBody {
    #[serde(default)]
    entry: Vec<GranuleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct GranuleEntry {
    #[serde(default)]
    producer_granule_id: Option<String>,
    title: String,
    #[serde(default)]
    links: Vec<GranuleLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct GranuleLink {
    href: String,
    #[serde(default)]
    rel: Option<String>,
    #[serde(default)]
    inherited: bool,
}

impl GranuleEntry {
    fn identifier(&self) -> &str {
        self.producer_granule_id.as_deref().unwrap_or(&self.title)
    }

    /// First direct HTTPS link to the granule file itself.
    fn data_link(&self) -> Option<&str> {
        self.links
            .iter()
            .filter(|link| !link.inherited && link.href.starts_with("https://"))
            .find(|link| {
                link.rel
                    .as_deref()
                    .is_some_and(|rel| rel.ends_with(DATA_REL_SUFFIX))
            })
            .map(|link| link.href.as_str())
    }
}

/// CMR granule search and MODIS granule downloads over blocking HTTP.
#[derive(Clone)]
pub struct CmrHttpClient {
    client: Client,
    search_url: String,
    credentials: Option<EarthdataCredentials>,
}

impl CmrHttpClient {
    pub fn new(session: &EarthdataSession) -> Result<Self, CoregError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("msg-coreg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CoregError::CmrHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| CoregError::CmrHttp(err.to_string()))?;

        Ok(Self {
            client,
            search_url: CMR_GRANULES_URL.to_string(),
            credentials: session.credentials().cloned(),
        })
    }

    fn entries(
        &self,
        short_name: &str,
        bbox: &BoundingBox,
        start: Instant,
        end: Instant,
    ) -> Result<Vec<GranuleEntry>, CoregError> {
        let temporal = temporal_param(start, end);
        let bounding_box = bbox.to_string();
        let mut entries = Vec::new();
        let mut page_num = 1usize;
        loop {
            let response = self
                .client
                .get(&self.search_url)
                .query(&[
                    ("short_name", short_name),
                    ("bounding_box", bounding_box.as_str()),
                    ("temporal", temporal.as_str()),
                    ("sort_key", "start_date"),
                ])
                .query(&[("page_size", PAGE_SIZE), ("page_num", page_num)])
                .send()
                .map_err(|err| CoregError::CmrHttp(err.to_string()))?;
            let feed: GranuleFeed = check_status(response)?
                .json()
                .map_err(|err| CoregError::CmrHttp(err.to_string()))?;
            let count = feed.feed.entry.len();
            debug!(page_num, count, "CMR page");
            entries.extend(feed.feed.entry);
            if count < PAGE_SIZE {
                break;
            }
            page_num += 1;
        }
        Ok(entries)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(EarthdataCredentials::Token(token)) => request.bearer_auth(token),
            Some(EarthdataCredentials::Login { login, password }) => {
                request.basic_auth(login, Some(password))
            }
            None => request,
        }
    }

    fn fetch_granule(&self, url: &str, destination: &Path) -> Result<(), CoregError> {
        let response = self
            .authorized(self.client.get(url))
            .send()
            .map_err(|err| CoregError::CmrHttp(err.to_string()))?;
        let mut response = check_status(response)?;
        write_atomic(destination, |file| {
            std::io::copy(&mut response, file)
                .map(|_| ())
                .map_err(|err| CoregError::CmrHttp(err.to_string()))
        })
    }
}

impl CatalogClient for CmrHttpClient {
    fn search(
        &self,
        short_name: &str,
        bbox: &BoundingBox,
        start: Instant,
        end: Instant,
    ) -> Result<Vec<String>, CoregError> {
        let entries = self.entries(short_name, bbox, start, end)?;
        Ok(entries
            .iter()
            .map(|entry| entry.identifier().to_string())
            .collect())
    }
}

impl PolarTransport for CmrHttpClient {
    fn download(&self, request: &PolarRequest) -> Result<Vec<PathBuf>, CoregError> {
        ensure_dir(&request.save_dir)?;
        let step = request.day_step.max(1) as usize;
        let mut files = Vec::new();
        for (start, end) in request.window.daily_windows().into_iter().step_by(step) {
            let entries = self.entries(&request.short_name, &request.bbox, start, end)?;
            for entry in &entries {
                let Some(url) = entry.data_link() else {
                    debug!(granule = entry.identifier(), "no data link, skipping");
                    continue;
                };
                let destination = request.save_dir.join(file_name_from_url(url));
                if files.contains(&destination) {
                    continue;
                }
                if destination.exists() {
                    debug!(path = %destination.display(), "already downloaded");
                } else {
                    info!(granule = entry.identifier(), "fetching");
                    self.fetch_granule(url, &destination)?;
                }
                files.push(destination);
            }
        }
        Ok(files)
    }
}

fn check_status(response: Response) -> Result<Response, CoregError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "CMR request failed".to_string());
    Err(CoregError::CmrStatus { status, message })
}

/// CMR `temporal` parameter: `start,end` in ISO 8601 UTC.
pub fn temporal_param(start: Instant, end: Instant) -> String {
    format!(
        "{},{}",
        start.format(CMR_TIME_FORMAT),
        end.format(CMR_TIME_FORMAT)
    )
}

fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

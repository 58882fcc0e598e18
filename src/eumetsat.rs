use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{GeoProduct, Instant};
use crate::error::CoregError;
use crate::geostationary::{GeoRequest, GeoTransport};
use crate::naming::msg_acquisition_instant;
use crate::store::{ensure_dir, write_atomic};

pub const CONSUMER_KEY_VAR: &str = "EUMETSAT_CONSUMER_KEY";
pub const CONSUMER_SECRET_VAR: &str = "EUMETSAT_CONSUMER_SECRET";

const API_URL: &str = "https://api.eumetsat.int";
const SEARCH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Half-width of the search window around each requested instant: one SEVIRI
/// full-disk repeat cycle.
pub const SEARCH_HALF_WINDOW_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct EumetsatCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl EumetsatCredentials {
    pub fn from_env() -> Result<Self, CoregError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CoregError::MissingCredentials(name.to_string()))
        };
        Ok(Self {
            consumer_key: read(CONSUMER_KEY_VAR)?,
            consumer_secret: read(CONSUMER_SECRET_VAR)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<SearchFeature>,
}

#[derive(Debug, Deserialize)]
struct SearchFeature {
    id: String,
}

/// Product closest in time to `target`, with its sensing instant. Ids that do not
/// follow SEVIRI naming are ignored.
pub fn nearest_product(ids: &[String], target: Instant) -> Option<(&str, Instant)> {
    ids.iter()
        .filter_map(|id| match msg_acquisition_instant(Path::new(id)) {
            Ok(sensed) => Some((id.as_str(), sensed)),
            Err(err) => {
                debug!("ignoring search result: {err}");
                None
            }
        })
        .min_by_key(|(_, sensed)| (*sensed - target).abs())
}

/// Search bounds for one requested instant.
pub fn search_bounds(target: Instant) -> (Instant, Instant) {
    let half = TimeDelta::minutes(SEARCH_HALF_WINDOW_MINUTES);
    (target - half, target + half)
}

/// EUMETSAT Data Store search and download over blocking HTTP.
#[derive(Clone)]
pub struct EumetsatHttpClient {
    client: Client,
    base_url: String,
    credentials: EumetsatCredentials,
}

impl EumetsatHttpClient {
    pub fn new(credentials: EumetsatCredentials) -> Result<Self, CoregError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("msg-coreg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: API_URL.to_string(),
            credentials,
        })
    }

    fn access_token(&self) -> Result<String, CoregError> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .basic_auth(
                &self.credentials.consumer_key,
                Some(&self.credentials.consumer_secret),
            )
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;
        let token: TokenResponse = check_status(response)?
            .json()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;
        Ok(token.access_token)
    }

    fn search(
        &self,
        token: &str,
        product: GeoProduct,
        target: Instant,
    ) -> Result<Vec<String>, CoregError> {
        let (start, end) = search_bounds(target);
        let dtstart = start.format(SEARCH_TIME_FORMAT).to_string();
        let dtend = end.format(SEARCH_TIME_FORMAT).to_string();
        let response = self
            .client
            .get(format!("{}/data/search-products/1.0.0/os", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("format", "json"),
                ("pi", product.collection()),
                ("dtstart", dtstart.as_str()),
                ("dtend", dtend.as_str()),
            ])
            .send()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;
        let results: SearchResponse = check_status(response)?
            .json()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;
        Ok(results.features.into_iter().map(|feature| feature.id).collect())
    }

    fn fetch_product(
        &self,
        token: &str,
        product: GeoProduct,
        product_id: &str,
        destination: &Path,
    ) -> Result<(), CoregError> {
        let url = format!(
            "{}/data/download/1.0.0/collections/{}/products/{}/entry",
            self.base_url,
            encode_collection(product.collection()),
            product_id
        );
        let entry = product_file_name(product, product_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("name", entry.as_str())])
            .send()
            .map_err(|err| CoregError::EumetsatHttp(err.to_string()))?;
        let mut response = check_status(response)?;
        write_atomic(destination, |file| {
            std::io::copy(&mut response, file)
                .map(|_| ())
                .map_err(|err| CoregError::EumetsatHttp(err.to_string()))
        })
    }
}

impl GeoTransport for EumetsatHttpClient {
    fn download(&self, request: &GeoRequest) -> Result<(Vec<PathBuf>, Vec<Instant>), CoregError> {
        ensure_dir(&request.save_dir)?;
        let token = self.access_token()?;
        let mut files = Vec::new();
        let mut queries = Vec::new();
        for target in &request.timestamps {
            let ids = self.search(&token, request.product, *target)?;
            let Some((product_id, sensed)) = nearest_product(&ids, *target) else {
                warn!(instant = %target, "no {} scan within the search window", request.product);
                continue;
            };
            let destination = request
                .save_dir
                .join(product_file_name(request.product, product_id));
            if destination.exists() {
                debug!(path = %destination.display(), "already downloaded");
            } else {
                info!(product_id, %sensed, "fetching");
                self.fetch_product(&token, request.product, product_id, &destination)?;
            }
            files.push(destination);
            queries.push(*target);
        }
        Ok((files, queries))
    }
}

fn check_status(response: Response) -> Result<Response, CoregError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "EUMETSAT request failed".to_string());
    Err(CoregError::EumetsatStatus { status, message })
}

pub fn product_file_name(product: GeoProduct, product_id: &str) -> String {
    format!("{product_id}.{}", product.extension())
}

fn encode_collection(collection: &str) -> String {
    collection.replace(':', "%3A")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn instant(s: &str) -> Instant {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn nearest_product_takes_smallest_offset_either_side() {
        let ids = vec![
            "MSG4-SEVI-MSG15-0100-NA-20230601122743.664000000Z-NA".to_string(),
            "MSG4-SEVI-MSG15-0100-NA-20230601124243.123000000Z-NA".to_string(),
            "not-a-seviri-product".to_string(),
        ];
        let (id, sensed) = nearest_product(&ids, instant("2023-06-01 12:35:00")).unwrap();
        assert_eq!(id, "MSG4-SEVI-MSG15-0100-NA-20230601122743.664000000Z-NA");
        assert_eq!(sensed, instant("2023-06-01 12:27:43"));

        let (id, _) = nearest_product(&ids, instant("2023-06-01 12:40:00")).unwrap();
        assert!(id.contains("20230601124243"));
    }

    #[test]
    fn nearest_product_of_nothing_is_none() {
        assert!(nearest_product(&[], instant("2023-06-01 12:35:00")).is_none());
    }

    #[test]
    fn search_window_spans_a_repeat_cycle_each_side() {
        let (start, end) = search_bounds(instant("2023-06-01 00:05:00"));
        assert_eq!(start, instant("2023-05-31 23:50:00"));
        assert_eq!(end, instant("2023-06-01 00:20:00"));
    }

    #[test]
    fn saved_names_parse_back_to_sensing_time() {
        let name = product_file_name(
            GeoProduct::CloudMask,
            "MSG4-SEVI-MSGCLMK-0100-0100-20230601123000.000000000Z-NA",
        );
        assert!(name.ends_with(".grb"));
        assert_eq!(
            msg_acquisition_instant(Path::new(&name)).unwrap(),
            instant("2023-06-01 12:30:00")
        );
        assert_eq!(
            encode_collection("EO:EUM:DAT:MSG:HRSEVIRI"),
            "EO%3AEUM%3ADAT%3AMSG%3AHRSEVIRI"
        );
    }
}

use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, TemporalWindow};
use crate::error::CoregError;
use crate::store::Store;

pub const DEFAULT_CONFIG_FILE: &str = "msg-coreg.json";

/// Run parameters as written in `msg-coreg.json`. Every field is optional.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    #[serde(default = "default_save_dir")]
    pub save_dir: String,
    #[serde(default = "default_true")]
    pub cloud_mask: bool,
    #[serde(default)]
    pub fire_mask: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            start_time: default_start_time(),
            end_time: default_end_time(),
            bounding_box: BoundingBox::default(),
            save_dir: default_save_dir(),
            cloud_mask: true,
            fire_mask: false,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub product: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    pub save_dir: Option<String>,
    pub cloud_mask: Option<bool>,
    pub fire_mask: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub product: String,
    pub window: TemporalWindow,
    pub bbox: BoundingBox,
    pub save_dir: Utf8PathBuf,
    pub cloud_mask: bool,
    pub fire_mask: bool,
}

impl ResolvedConfig {
    pub fn store(&self) -> Store {
        Store::new(self.save_dir.clone())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `msg-coreg.json` in the working directory when no path is given.
    /// A missing default file means built-in defaults; a missing explicit file is an error.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, CoregError> {
        let config = Self::load(path)?;
        Self::resolve_config(Self::apply_overrides(config, overrides))
    }

    pub fn load(path: Option<&str>) -> Result<RunConfig, CoregError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(RunConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CoregError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| CoregError::ConfigParse(err.to_string()))
    }

    pub fn apply_overrides(mut config: RunConfig, overrides: ConfigOverrides) -> RunConfig {
        if let Some(product) = overrides.product {
            config.product = product;
        }
        if let Some(start_date) = overrides.start_date {
            config.start_date = start_date;
        }
        if let Some(end_date) = overrides.end_date {
            config.end_date = end_date;
        }
        if let Some(start_time) = overrides.start_time {
            config.start_time = start_time;
        }
        if let Some(end_time) = overrides.end_time {
            config.end_time = end_time;
        }
        if let Some(bbox) = overrides.bounding_box {
            config.bounding_box = bbox;
        }
        if let Some(save_dir) = overrides.save_dir {
            config.save_dir = save_dir;
        }
        if let Some(cloud_mask) = overrides.cloud_mask {
            config.cloud_mask = cloud_mask;
        }
        if let Some(fire_mask) = overrides.fire_mask {
            config.fire_mask = fire_mask;
        }
        config
    }

    pub fn resolve_config(config: RunConfig) -> Result<ResolvedConfig, CoregError> {
        let window = TemporalWindow::parse(
            &config.start_date,
            &config.end_date,
            &config.start_time,
            &config.end_time,
        )?;
        let product = config.product.trim().to_string();
        if product.is_empty() {
            return Err(CoregError::UnknownProduct(config.product));
        }

        Ok(ResolvedConfig {
            product,
            window,
            bbox: config.bounding_box,
            save_dir: Utf8PathBuf::from(config.save_dir),
            cloud_mask: config.cloud_mask,
            fire_mask: config.fire_mask,
        })
    }
}

fn default_product() -> String {
    "MYD021KM".to_string()
}

fn default_start_date() -> String {
    "2023-06-01".to_string()
}

fn default_end_date() -> String {
    "2023-09-30".to_string()
}

fn default_start_time() -> String {
    "00:00:00".to_string()
}

fn default_end_time() -> String {
    "23:59:00".to_string()
}

fn default_save_dir() -> String {
    "./data".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.product, "MYD021KM");
        assert_eq!(resolved.bbox, BoundingBox::default());
        assert!(resolved.cloud_mask);
        assert!(!resolved.fire_mask);
        assert_eq!(resolved.window.start_date().to_string(), "2023-06-01");
        assert_eq!(resolved.window.end_time().to_string(), "23:59:00");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config: RunConfig =
            serde_json::from_str(r#"{"product": "MYD021KM", "fire_mask": false}"#).unwrap();
        let overrides = ConfigOverrides {
            product: Some("MOD021KM".to_string()),
            cloud_mask: Some(false),
            ..Default::default()
        };
        let resolved =
            ConfigLoader::resolve_config(ConfigLoader::apply_overrides(config, overrides))
                .unwrap();
        assert_eq!(resolved.product, "MOD021KM");
        assert!(!resolved.cloud_mask);
    }

    #[test]
    fn bounding_box_is_validated_on_parse() {
        let result: Result<RunConfig, _> =
            serde_json::from_str(r#"{"bounding_box": [10.0, 0.0, -10.0, 5.0]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let config = RunConfig {
            start_date: "2023-09-30".to_string(),
            end_date: "2023-06-01".to_string(),
            ..Default::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(CoregError::InvalidWindow(_))
        );
    }
}

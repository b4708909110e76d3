//! Application settings.
//!
//! Sources, lowest priority first: built-in defaults, `earthdata.toml` in the
//! user config directory, `earthdata.toml` in the working directory, then
//! `EARTHDATA__<SECTION>__<KEY>` environment variables.

use crate::types::EarthDataResult;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const FILE_STEM: &str = "earthdata";
const ENV_PREFIX: &str = "EARTHDATA";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub endpoint: String,
    /// Cloud project the requests are billed to
    pub project: String,
    /// OAuth bearer token, e.g. from `gcloud auth print-access-token`
    pub access_token: String,
    pub timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: crate::io::rest::DEFAULT_ENDPOINT.to_string(),
            project: String::new(),
            access_token: String::new(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub name: String,
    pub band: String,
    /// Inclusive
    pub start_date: NaiveDate,
    /// Exclusive
    pub end_date: NaiveDate,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            name: "MODIS/006/MOD44W".to_string(),
            band: "water_mask".to_string(),
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2015, 5, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub lat: f64,
    pub lon: f64,
    /// Rectangle extent along longitude, degrees
    pub width: f64,
    /// Rectangle extent along latitude, degrees
    pub height: f64,
    /// Sampling scale in meters
    pub scale: f64,
}

impl Default for RegionSettings {
    fn default() -> Self {
        // Lake Chapala
        Self {
            lat: 20.24,
            lon: -103.06,
            width: 0.8,
            height: 0.3,
            scale: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub pixel_scale: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            pixel_scale: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub dataset: DatasetSettings,
    pub region: RegionSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Load settings from the default locations and the environment
    pub fn load() -> EarthDataResult<Self> {
        let mut files = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            files.push(dir.join(FILE_STEM).join(FILE_STEM));
        }
        files.push(PathBuf::from(FILE_STEM));
        Self::load_from(&files)
    }

    /// Load settings from optional config files (extension inferred) and the environment
    pub fn load_from<P: AsRef<Path>>(files: &[P]) -> EarthDataResult<Self> {
        let mut builder = config::Config::builder();
        for file in files {
            let file = file.as_ref();
            log::debug!("Config source: {}", file.display());
            builder = builder.add_source(config::File::from(file).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

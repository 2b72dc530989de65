use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::api::{CatalogSpec, LayerSpec};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_CATALOG_ID: &str = "strava-analysis-tool";
pub const DEFAULT_LAYER_ID: &str = "strava-activity-data";
pub const DEFAULT_LOOKUP_URL: &str = "https://api-lookup.data.api.platform.here.com/lookup/v1";
pub const DEFAULT_CONFIG_URL: &str = "https://config.data.api.platform.here.com/config/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STATUS_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_STATUS_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_DELETE_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(size) => size,
    None => panic!("delete batch size must be non-zero"),
};

pub const CATALOG_HRN_PREFIX: &str = "hrn:here:data:::";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub here: SyncSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub geo_data_file: PathBuf,
    pub here_credentials_file: PathBuf,
}

// Every key is optional in the [here] section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub catalog_id: String,
    pub catalog_name: String,
    pub catalog_summary: String,
    pub catalog_description: String,
    pub layer_id: String,
    pub layer_name: String,
    pub layer_summary: String,
    pub layer_description: String,
    pub delete_batch_size: NonZeroUsize,
    pub lookup_url: String,
    pub config_url: String,
    pub timeout_secs: u64,
    /// Polls of the catalog creation status before giving up
    pub status_poll_attempts: u32,
    pub status_poll_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            catalog_id: DEFAULT_CATALOG_ID.to_string(),
            catalog_name: "Strava Analysis Tool".to_string(),
            catalog_summary: "Strava Analysis Tool".to_string(),
            catalog_description: "Strava data collected by Strava Analysis Tool".to_string(),
            layer_id: DEFAULT_LAYER_ID.to_string(),
            layer_name: "Strava Activity Data".to_string(),
            layer_summary: "Strava Activity Data".to_string(),
            layer_description: "Strava data collected by Strava Analysis Tool".to_string(),
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            config_url: DEFAULT_CONFIG_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            status_poll_attempts: DEFAULT_STATUS_POLL_ATTEMPTS,
            status_poll_interval_secs: DEFAULT_STATUS_POLL_INTERVAL_SECS,
        }
    }
}

impl SyncSettings {
    pub fn catalog_hrn(&self) -> String {
        format!("{}{}", CATALOG_HRN_PREFIX, self.catalog_id)
    }

    pub fn catalog_spec(&self) -> CatalogSpec {
        CatalogSpec {
            id: self.catalog_id.clone(),
            name: self.catalog_name.clone(),
            summary: self.catalog_summary.clone(),
            description: self.catalog_description.clone(),
        }
    }

    pub fn layer_spec(&self) -> LayerSpec {
        LayerSpec::interactive_map(
            &self.layer_id,
            &self.layer_name,
            &self.layer_summary,
            &self.layer_description,
        )
    }
}

impl ToolConfig {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

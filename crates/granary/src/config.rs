use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use granary_batch::{DEFAULT_CHUNK_SIZE, DEFAULT_TILE_PATTERN, JobSpec};
use granary_fetch::{ChunkPool, TransferOptions};
use serde::{Deserialize, Serialize};

/// Runtime settings.
///
/// Layered lowest to highest: built-in defaults, the TOML file, `GRANARY_`
/// environment variables (`__` separates nested keys, so
/// `GRANARY_TRANSFER__CHUNK_SIZE` sets `transfer.chunk_size`), then CLI
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ledger_path: PathBuf,
    /// `s3://bucket/prefix` or `file:///directory`.
    pub destination: Option<String>,
    pub staging_dir: PathBuf,
    pub region:      String,
    pub endpoints:   Endpoints,
    pub catalog:     CatalogSettings,
    pub transfer:    TransferSettings,
    pub batch:       BatchSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub cmr_host:        String,
    pub login_host:      String,
    pub token_url:       String,
    pub credentials_url: String,
    pub job_queue_url:   String,
    pub client_id:       String,
    pub user_ip:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Bytes per multipart upload part.
    pub chunk_size:           usize,
    /// Upload parts in flight at once, across all artifacts.
    pub part_pool:            usize,
    pub timeout_secs:         u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs:    u64,
    pub max_redirects:        usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Tiles per submitted job.
    pub chunk_size:   usize,
    /// Job submissions in flight at once.
    pub concurrency:  usize,
    pub tile_pattern: String,
    pub job:          JobSpec,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = home::home_dir().unwrap_or_default().join(".granary");
        Self {
            ledger_path: data_dir.join("ledger"),
            destination: None,
            staging_dir: std::env::temp_dir(),
            region:      Self::DEFAULT_REGION.to_string(),
            endpoints:   Endpoints::default(),
            catalog:     CatalogSettings::default(),
            transfer:    TransferSettings::default(),
            batch:       BatchSettings::default(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cmr_host:        "cmr.earthdata.nasa.gov".to_string(),
            login_host:      "urs.earthdata.nasa.gov".to_string(),
            token_url:       "https://cmr.earthdata.nasa.gov/legacy-services/rest/tokens".to_string(),
            credentials_url: "https://data.lpdaac.earthdatacloud.nasa.gov/s3credentials".to_string(),
            job_queue_url:   "http://localhost:8888/api/v0.1/job/submit".to_string(),
            client_id:       "granary".to_string(),
            user_ip:         "127.0.0.1".to_string(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self { Self { page_size: 2000 } }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size:           TransferOptions::DEFAULT_CHUNK_SIZE,
            part_pool:            ChunkPool::DEFAULT_SIZE,
            timeout_secs:         3600,
            connect_timeout_secs: 30,
            read_timeout_secs:    120,
            max_redirects:        10,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size:   DEFAULT_CHUNK_SIZE,
            concurrency:  8,
            tile_pattern: DEFAULT_TILE_PATTERN.to_string(),
            job:          JobSpec::default(),
        }
    }
}

impl TransferSettings {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }

    pub fn read_timeout(&self) -> Duration { Duration::from_secs(self.read_timeout_secs) }
}

/// Values given on the command line, applied over every other layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl Settings {
    pub const DEFAULT_REGION: &str = "us-west-2";
    pub const FILE_NAME: &str = "granary.toml";
    pub const ENV_PREFIX: &str = "GRANARY_";

    pub fn figment(file: Option<&Path>, overrides: &Overrides) -> Figment {
        let file = file.map_or_else(|| PathBuf::from(Self::FILE_NAME), Path::to_path_buf);
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__").ignore(&["config"]))
            .merge(Serialized::defaults(overrides))
    }

    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, figment::Error> {
        Self::figment(file, overrides).extract()
    }
}

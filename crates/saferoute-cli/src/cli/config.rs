//! YAML configuration for data sources and remote services.
//!
//! Every field has a default, so an empty file (or no file) gives a working
//! offline setup. Example:
//!
//! ```yaml
//! center: { lat: 37.762, lng: 126.780 }
//! data:
//!   boundary: boundary.geojson
//!   traces: traces.geojson
//! wfs:
//!   api_key: "..."
//! router:
//!   profile: foot
//!   timeout_secs: 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use saferoute::{LatLng, OpenMeteo, OsrmOracle, WfsClient};

/// Environment variable consulted when no WFS key is in the file.
pub const WFS_KEY_ENV: &str = "SAFEROUTE_WFS_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub center: Center,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub wfs: WfsConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Map centre; also where live weather is observed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

impl Default for Center {
    fn default() -> Self {
        Self { lat: 37.762, lng: 126.780 }
    }
}

impl Center {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Local GeoJSON files. A file path wins over the WFS service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelters: Option<PathBuf>,
}

impl DataConfig {
    fn rebase(&mut self, dir: &Path) {
        for path in [&mut self.boundary, &mut self.traces, &mut self.shelters].into_iter().flatten() {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WfsConfig {
    #[serde(default = "default_wfs_base")]
    pub base_url: String,

    /// Without a key the WFS layers are not used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_flood_layer")]
    pub flood_layer: String,

    #[serde(default = "default_shelter_layer")]
    pub shelter_layer: String,

    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_wfs_timeout")]
    pub timeout_secs: u64,
}

fn default_wfs_base() -> String {
    WfsClient::DEFAULT_BASE_URL.to_string()
}

fn default_flood_layer() -> String {
    "spggcee:tm_fldn_trce".to_string()
}

fn default_shelter_layer() -> String {
    "spggcee:dsvctm_tmpr_hab_fclt".to_string()
}

fn default_max_features() -> usize {
    5000
}

fn default_wfs_timeout() -> u64 {
    60
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            base_url: default_wfs_base(),
            api_key: None,
            flood_layer: default_flood_layer(),
            shelter_layer: default_shelter_layer(),
            max_features: default_max_features(),
            timeout_secs: default_wfs_timeout(),
        }
    }
}

impl WfsConfig {
    /// Client when a key is available (file first, then environment). A blank
    /// key counts as none.
    pub fn client(&self) -> Option<WfsClient> {
        let key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(WFS_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())?;
        Some(WfsClient::new(
            &self.base_url,
            key,
            self.max_features,
            Duration::from_secs(self.timeout_secs),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_router_base")]
    pub base_url: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_router_timeout")]
    pub timeout_secs: u64,
}

fn default_router_base() -> String {
    OsrmOracle::DEFAULT_BASE_URL.to_string()
}

fn default_profile() -> String {
    OsrmOracle::DEFAULT_PROFILE.to_string()
}

fn default_router_timeout() -> u64 {
    10
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_router_base(),
            profile: default_profile(),
            timeout_secs: default_router_timeout(),
        }
    }
}

impl RouterConfig {
    pub fn oracle(&self) -> OsrmOracle {
        OsrmOracle::new(&self.base_url, &self.profile, Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base")]
    pub base_url: String,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

fn default_weather_base() -> String {
    OpenMeteo::DEFAULT_BASE_URL.to_string()
}

fn default_timezone() -> String {
    OpenMeteo::DEFAULT_TIMEZONE.to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base(),
            timezone: default_timezone(),
            timeout_secs: default_weather_timeout(),
        }
    }
}

impl WeatherConfig {
    pub fn source(&self, location: LatLng) -> OpenMeteo {
        OpenMeteo::new(
            &self.base_url,
            location,
            &self.timezone,
            Duration::from_secs(self.timeout_secs),
        )
    }
}

impl Config {
    /// Load from a YAML file. Relative data paths are taken relative to the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config =
            Self::parse(&content).with_context(|| format!("failed to parse config file {}", path.display()))?;
        if let Some(dir) = path.parent() {
            config.data.rebase(dir);
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// The file if given, otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

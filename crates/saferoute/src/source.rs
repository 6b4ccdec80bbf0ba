//! Collaborator data sources: boundary, flood traces, shelters.
//!
//! Each is a trait so the engine doesn't care where data lives. File-backed
//! GeoJSON and the provincial WFS service are provided.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use geojson::Feature;

use crate::features::{feature_rings, parse_features, shelter_from_feature};
use crate::geometry::Ring;
use crate::shelter::Shelter;

/// WFS GetFeature responses can be tens of megabytes.
const MAX_BODY_BYTES: u64 = 128 * 1024 * 1024;

/// A data source could not deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    Io { path: PathBuf, message: String },
    Http(String),
    Decode(String),
    /// Source needs configuration that isn't there (e.g. an API key).
    NotConfigured(&'static str),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { path, message } => write!(f, "cannot read {}: {}", path.display(), message),
            SourceError::Http(msg) => write!(f, "request failed: {}", msg),
            SourceError::Decode(msg) => write!(f, "unreadable response: {}", msg),
            SourceError::NotConfigured(what) => write!(f, "not configured: {}", what),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<ureq::Error> for SourceError {
    fn from(e: ureq::Error) -> Self {
        SourceError::Http(e.to_string())
    }
}

/// Historical flood-trace rings, WGS84.
pub trait FloodTraceSource {
    fn traces(&self) -> Result<Vec<Ring>, SourceError>;
}

/// Zone-of-interest outline, WGS84. May legitimately be empty.
pub trait BoundarySource {
    fn boundary_rings(&self) -> Result<Vec<Ring>, SourceError>;
}

/// Known shelters.
pub trait ShelterDirectory {
    fn shelters(&self) -> Result<Vec<Shelter>, SourceError>;
}

// ============================================================================
// FEATURE PROVIDERS
// ============================================================================

/// Where a layer's features come from.
pub enum FeatureSource {
    /// A GeoJSON file on disk.
    File(PathBuf),
    /// A named layer on a WFS endpoint.
    Wfs { client: WfsClient, layer: String },
    /// Nothing configured; yields no features.
    Empty,
}

impl FeatureSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        FeatureSource::File(path.as_ref().to_path_buf())
    }

    pub fn features(&self) -> Result<Vec<Feature>, SourceError> {
        match self {
            FeatureSource::File(path) => read_feature_file(path),
            FeatureSource::Wfs { client, layer } => client.get_features(layer),
            FeatureSource::Empty => Ok(Vec::new()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FeatureSource::File(path) => format!("file {}", path.display()),
            FeatureSource::Wfs { layer, .. } => format!("WFS layer {}", layer),
            FeatureSource::Empty => "nothing".to_string(),
        }
    }
}

fn read_feature_file(path: &Path) -> Result<Vec<Feature>, SourceError> {
    let text = fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_features(&text).map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))
}

/// Flood traces: exterior rings of every polygonal feature.
pub struct TraceLayer(pub FeatureSource);

impl FloodTraceSource for TraceLayer {
    fn traces(&self) -> Result<Vec<Ring>, SourceError> {
        Ok(feature_rings(&self.0.features()?))
    }
}

/// Boundary: exterior rings of every polygonal feature.
pub struct BoundaryLayer(pub FeatureSource);

impl BoundarySource for BoundaryLayer {
    fn boundary_rings(&self) -> Result<Vec<Ring>, SourceError> {
        Ok(feature_rings(&self.0.features()?))
    }
}

/// Shelters: every usable `Point` feature.
pub struct ShelterLayer(pub FeatureSource);

impl ShelterDirectory for ShelterLayer {
    fn shelters(&self) -> Result<Vec<Shelter>, SourceError> {
        Ok(self.0.features()?.iter().filter_map(shelter_from_feature).collect())
    }
}

// ============================================================================
// WFS
// ============================================================================

/// OGC WFS 1.1.0 GetFeature client returning GeoJSON in EPSG:4326.
pub struct WfsClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    max_features: usize,
}

impl WfsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://climate.gg.go.kr/ols/api/geoserver/wfs";

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_features: usize,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_features,
        }
    }

    /// Query parameters for one layer, in request order.
    pub fn query(&self, type_name: &str) -> Vec<(&'static str, String)> {
        vec![
            ("apiKey", self.api_key.clone()),
            ("service", "WFS".to_string()),
            ("version", "1.1.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", type_name.to_string()),
            ("outputFormat", "application/json".to_string()),
            ("srsName", "EPSG:4326".to_string()),
            ("maxFeatures", self.max_features.to_string()),
        ]
    }

    pub fn get_features(&self, type_name: &str) -> Result<Vec<Feature>, SourceError> {
        let request = self
            .query(type_name)
            .into_iter()
            .fold(self.agent.get(&self.base_url), |req, (k, v)| req.query(k, v));

        let text = request
            .call()?
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()?;

        parse_features(&text).map_err(|e| SourceError::Decode(format!("WFS {}: {}", type_name, e)))
    }
}

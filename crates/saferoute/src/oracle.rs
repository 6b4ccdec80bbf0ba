//! Routing oracles: something that turns (origin, destination) into a path.
//!
//! The engine only ever sees the [`RoutingOracle`] trait. Two implementations
//! ship here: [`OsrmOracle`] for real road routes over HTTP and
//! [`DirectOracle`], a straight great-circle line for offline runs.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::geometry::LatLng;

/// Path plus road distance, as reported by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRoute {
    pub path: Vec<LatLng>,
    pub distance_m: f64,
}

/// Why the oracle produced nothing usable. The engine treats all of these the
/// same way: skip the candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleError {
    /// Connection, DNS, timeout...
    Transport(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Response body wasn't what we expected.
    Decode(String),
    /// Valid response, but no route between the two points.
    NoRoute,
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Transport(msg) => write!(f, "routing request failed: {}", msg),
            OracleError::Status(code) => write!(f, "routing service answered HTTP {}", code),
            OracleError::Decode(msg) => write!(f, "routing response unreadable: {}", msg),
            OracleError::NoRoute => write!(f, "no route found"),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<ureq::Error> for OracleError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => OracleError::Status(code),
            other => OracleError::Transport(other.to_string()),
        }
    }
}

/// External path computation.
///
/// ## Rust Lesson #24: Traits
///
/// A trait is an interface. `find_route` is generic over `O: RoutingOracle`
/// so tests can hand it a scripted fake while the CLI passes the HTTP client.
pub trait RoutingOracle {
    fn route(&self, origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError>;
}

impl<T: RoutingOracle + ?Sized> RoutingOracle for &T {
    fn route(&self, origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError> {
        (**self).route(origin, destination)
    }
}

impl<T: RoutingOracle + ?Sized> RoutingOracle for Box<T> {
    fn route(&self, origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError> {
        (**self).route(origin, destination)
    }
}

// ============================================================================
// OSRM
// ============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// `[lng, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

/// OSRM `route` service client.
pub struct OsrmOracle {
    agent: ureq::Agent,
    base_url: String,
    profile: String,
}

impl OsrmOracle {
    pub const DEFAULT_BASE_URL: &'static str = "https://router.project-osrm.org";
    pub const DEFAULT_PROFILE: &'static str = "driving";

    /// Client with a global per-request timeout.
    pub fn new(base_url: impl Into<String>, profile: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: profile.into(),
        }
    }

    pub fn route_url(&self, origin: LatLng, destination: LatLng) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, self.profile, origin.lng, origin.lat, destination.lng, destination.lat
        )
    }
}

impl RoutingOracle for OsrmOracle {
    fn route(&self, origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError> {
        let url = self.route_url(origin, destination);
        let body: OsrmResponse = self
            .agent
            .get(&url)
            .call()?
            .body_mut()
            .read_json()
            .map_err(|e| OracleError::Decode(e.to_string()))?;
        parse_osrm(body)
    }
}

fn parse_osrm(body: OsrmResponse) -> Result<OracleRoute, OracleError> {
    let route = body.routes.into_iter().next().ok_or(OracleError::NoRoute)?;
    let path: Vec<LatLng> = route
        .geometry
        .coordinates
        .iter()
        .map(|&[lng, lat]| LatLng::new(lat, lng))
        .collect();
    if path.is_empty() {
        return Err(OracleError::NoRoute);
    }
    Ok(OracleRoute { path, distance_m: route.distance })
}

// ============================================================================
// DIRECT (offline)
// ============================================================================

/// Straight line between the two points, densified every `step_m` metres.
///
/// Distance is the great-circle distance. Useful without network access and
/// as a deterministic oracle in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectOracle {
    pub step_m: f64,
}

impl Default for DirectOracle {
    fn default() -> Self {
        Self { step_m: 25.0 }
    }
}

impl RoutingOracle for DirectOracle {
    fn route(&self, origin: LatLng, destination: LatLng) -> Result<OracleRoute, OracleError> {
        let distance_m = origin.distance(destination);
        let segments = if self.step_m > 0.0 {
            ((distance_m / self.step_m).ceil() as usize).max(1)
        } else {
            1
        };
        let path = (0..=segments)
            .map(|i| origin.lerp(destination, i as f64 / segments as f64))
            .collect();
        Ok(OracleRoute { path, distance_m })
    }
}

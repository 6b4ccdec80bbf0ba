//! # saferoute
//!
//! Flood danger-zone modelling and evacuation route-safety engine.
//!
//! Rainfall goes in, a buffered danger region comes out, and routes to
//! shelters are checked against it before anyone is sent along them.
//!
//! ## Rust Lesson #7: Modules
//!
//! Rust modules are like ES6 modules but more explicit:
//! - `mod foo;` = load from `foo.rs` or `foo/mod.rs`
//! - `pub mod foo;` = also export it publicly
//! - `pub use foo::Bar;` = re-export Bar at this level
//!
//! Unlike Node.js, you must explicitly declare every module.

pub mod buffer;
pub mod context;
pub mod export;
pub mod features;
pub mod geometry;
pub mod oracle;
pub mod predicate;
pub mod region;
pub mod route;
pub mod severity;
pub mod shelter;
pub mod source;
pub mod weather;

// Re-export common types at crate root for convenience.
pub use context::{DataKind, LoadReport, RouteRecord, SimulationContext, Snapshot};
pub use geometry::{LatLng, Ring, RingError};
pub use oracle::{DirectOracle, OracleError, OracleRoute, OsrmOracle, RoutingOracle};
pub use predicate::{point_in_boundary, point_in_region, point_in_ring};
pub use region::{DangerRegion, DangerRegionBuilder, FloodTraceSet, build_region};
pub use route::{RouteError, RouteMode, SelectedRoute, find_route};
pub use severity::{Severity, StatusLine, TierStyle};
pub use shelter::{Shelter, ShelterClassification};
pub use source::{
    BoundaryLayer, BoundarySource, FeatureSource, FloodTraceSource, ShelterDirectory, ShelterLayer,
    SourceError, TraceLayer, WfsClient,
};
pub use weather::{OpenMeteo, RainfallReading, RainfallSource, WeatherCondition};

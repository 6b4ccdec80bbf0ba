//! The simulation context: loaded data plus the current snapshot.
//!
//! ## Rust Lesson #25: Arc snapshots instead of globals
//!
//! The danger region, severity and shelter split are computed together and
//! frozen into one [`Snapshot`] behind an `Arc`. Readers clone the `Arc`
//! (cheap, just a refcount bump) and keep a consistent view for the whole
//! cycle even if a new rainfall value arrives meanwhile. Writers never patch
//! a snapshot; they build a new one with the next generation number.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::geometry::{LatLng, Ring};
use crate::oracle::RoutingOracle;
use crate::predicate::{point_in_boundary, position_in_region};
use crate::region::{DangerRegion, DangerRegionBuilder, FloodTraceSet};
use crate::route::{RouteError, SelectedRoute, find_route};
use crate::severity::{Severity, StatusLine};
use crate::shelter::{Shelter, ShelterClassification};
use crate::source::{BoundarySource, FloodTraceSource, ShelterDirectory, SourceError};
use crate::weather::RainfallReading;

/// Everything derived from one rainfall value.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub reading: RainfallReading,
    pub severity: Severity,
    pub region: DangerRegion,
    pub shelters: ShelterClassification,
    pub computed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Status banner for this snapshot.
    pub fn status(&self) -> StatusLine {
        let mm = self.reading.millimetres();
        if self.reading.is_live() {
            StatusLine::live(mm, !self.region.is_none())
        } else {
            StatusLine::simulated(mm)
        }
    }

    pub fn in_danger(&self, position: LatLng) -> bool {
        position_in_region(position, &self.region)
    }
}

/// A route together with the snapshot it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    pub generation: u64,
    pub origin: LatLng,
    pub route: SelectedRoute,
    pub computed_at: DateTime<Utc>,
}

/// Which collaborator a degraded load came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Boundary,
    Traces,
    Shelters,
    Weather,
}

impl DataKind {
    pub fn name(&self) -> &'static str {
        match self {
            DataKind::Boundary => "boundary",
            DataKind::Traces => "flood trace",
            DataKind::Shelters => "shelter",
            DataKind::Weather => "weather",
        }
    }
}

/// What happened while loading collaborator data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub boundary_rings: usize,
    pub traces_loaded: usize,
    pub traces_outside: usize,
    pub shelters_loaded: usize,
    pub shelters_outside: usize,
    /// Sources that failed; the context runs on with empty data for them.
    pub degraded: Vec<(DataKind, SourceError)>,
}

impl LoadReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

pub struct SimulationContext {
    builder: DangerRegionBuilder,
    boundary: Vec<Ring>,
    directory: Vec<Shelter>,
    snapshot: Arc<Snapshot>,
    route: Option<RouteRecord>,
}

impl SimulationContext {
    /// Context with no danger yet (generation 0, 0 mm simulated).
    pub fn new(traces: FloodTraceSet, boundary: Vec<Ring>, shelters: Vec<Shelter>) -> Self {
        let reading = RainfallReading::simulated(0);
        let snapshot = Snapshot {
            generation: 0,
            reading,
            severity: Severity::classify(reading.millimetres()),
            region: DangerRegion::None,
            shelters: ShelterClassification::classify(&shelters, &DangerRegion::None),
            computed_at: Utc::now(),
        };
        Self {
            builder: DangerRegionBuilder::new(traces),
            boundary,
            directory: shelters,
            snapshot: Arc::new(snapshot),
            route: None,
        }
    }

    /// Load every collaborator, keeping only traces and shelters inside the
    /// boundary. Failed sources are reported, not fatal.
    pub fn load(
        boundary: &dyn BoundarySource,
        traces: &dyn FloodTraceSource,
        shelters: &dyn ShelterDirectory,
    ) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        let boundary_rings = boundary.boundary_rings().unwrap_or_else(|e| {
            warn!("boundary unavailable, not restricting by area: {}", e);
            report.degraded.push((DataKind::Boundary, e));
            Vec::new()
        });
        report.boundary_rings = boundary_rings.len();

        let raw_traces = traces.traces().unwrap_or_else(|e| {
            warn!("flood traces unavailable, no danger region can be built: {}", e);
            report.degraded.push((DataKind::Traces, e));
            Vec::new()
        });
        let (kept_traces, outside): (Vec<Ring>, Vec<Ring>) = raw_traces.into_iter().partition(|ring| {
            ring.first()
                .is_some_and(|p| point_in_boundary(p.lat, p.lng, &boundary_rings))
        });
        report.traces_loaded = kept_traces.len();
        report.traces_outside = outside.len();

        let raw_shelters = shelters.shelters().unwrap_or_else(|e| {
            warn!("shelter directory unavailable: {}", e);
            report.degraded.push((DataKind::Shelters, e));
            Vec::new()
        });
        let (kept_shelters, outside): (Vec<Shelter>, Vec<Shelter>) = raw_shelters
            .into_iter()
            .partition(|s| point_in_boundary(s.lat, s.lng, &boundary_rings));
        report.shelters_loaded = kept_shelters.len();
        report.shelters_outside = outside.len();

        info!(
            "loaded {} boundary rings, {} flood traces ({} outside), {} shelters ({} outside)",
            report.boundary_rings,
            report.traces_loaded,
            report.traces_outside,
            report.shelters_loaded,
            report.shelters_outside
        );

        let context = Self::new(FloodTraceSet::new(kept_traces), boundary_rings, kept_shelters);
        (context, report)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn traces(&self) -> &FloodTraceSet {
        self.builder.traces()
    }

    pub fn in_boundary(&self, position: LatLng) -> bool {
        point_in_boundary(position.lat, position.lng, &self.boundary)
    }

    /// Rebuild region, severity and shelter split for a new reading.
    ///
    /// The previous snapshot is replaced wholesale and any displayed route is
    /// discarded.
    pub fn apply_rainfall(&mut self, reading: RainfallReading) -> Arc<Snapshot> {
        let mm = reading.millimetres();
        let region = self.builder.build(mm);
        let shelters = ShelterClassification::classify(&self.directory, &region);
        let snapshot = Snapshot {
            generation: self.snapshot.generation + 1,
            reading,
            severity: Severity::classify(mm),
            region,
            shelters,
            computed_at: Utc::now(),
        };

        info!(
            "generation {}: {} mm ({}), {} region with {} polygons, {} reachable / {} flooded shelters",
            snapshot.generation,
            mm,
            snapshot.severity.name(),
            snapshot.region.kind(),
            snapshot.region.polygon_count(),
            snapshot.shelters.reachable.len(),
            snapshot.shelters.flooded.len()
        );

        self.route = None;
        self.snapshot = Arc::new(snapshot);
        self.snapshot()
    }

    /// Search for an evacuation route and make it the current one.
    ///
    /// Origins outside the boundary are rejected before any work. On failure
    /// the previous route is dropped too.
    pub fn find_route<O: RoutingOracle + ?Sized>(
        &mut self,
        origin: LatLng,
        oracle: &O,
    ) -> Result<&RouteRecord, RouteError> {
        self.route = None;
        if !self.in_boundary(origin) {
            return Err(RouteError::OutsideBoundary);
        }

        let snapshot = self.snapshot();
        let route = find_route(origin, &snapshot.shelters.reachable, &snapshot.region, oracle)?;
        let record = self.route.insert(RouteRecord {
            generation: snapshot.generation,
            origin,
            route,
            computed_at: Utc::now(),
        });
        Ok(&*record)
    }

    pub fn current_route(&self) -> Option<&RouteRecord> {
        self.route.as_ref()
    }
}

//! Common utilities shared across CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use log::{info, warn};
use serde::Serialize;

use saferoute::export;
use saferoute::{
    BoundaryLayer, DataKind, FeatureSource, LoadReport, RainfallReading, RainfallSource, RouteRecord, Severity,
    ShelterLayer, SimulationContext, Snapshot, StatusLine, TraceLayer, WeatherCondition,
};

use super::config::Config;

/// Flags every subcommand understands.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Boundary GeoJSON (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    pub boundary: Option<PathBuf>,

    /// Flood trace GeoJSON (overrides config and WFS)
    #[arg(long, global = true, value_name = "FILE")]
    pub traces: Option<PathBuf>,

    /// Shelter GeoJSON (overrides config and WFS)
    #[arg(long, global = true, value_name = "FILE")]
    pub shelters: Option<PathBuf>,

    /// Print a JSON report instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write region, shelters and route as a GeoJSON FeatureCollection
    #[arg(long, global = true, value_name = "FILE")]
    pub geojson: Option<PathBuf>,

    /// Log filter, e.g. `info` or `saferoute=debug` (default: RUST_LOG, then warn)
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// Loaded configuration and context for one command run.
pub struct Session {
    pub config: Config,
    pub context: SimulationContext,
    pub load: LoadReport,
}

impl Session {
    pub fn open(args: &CommonArgs) -> Result<Self> {
        let config = Config::load_or_default(args.config.as_deref())?;

        let boundary = BoundaryLayer(file_source(args.boundary.as_ref().or(config.data.boundary.as_ref())));
        let traces = TraceLayer(layer_source(
            args.traces.as_ref().or(config.data.traces.as_ref()),
            &config,
            &config.wfs.flood_layer,
        ));
        let shelters = ShelterLayer(layer_source(
            args.shelters.as_ref().or(config.data.shelters.as_ref()),
            &config,
            &config.wfs.shelter_layer,
        ));
        info!(
            "sources: boundary from {}, traces from {}, shelters from {}",
            boundary.0.describe(),
            traces.0.describe(),
            shelters.0.describe()
        );

        let (context, load) = SimulationContext::load(&boundary, &traces, &shelters);
        Ok(Self { config, context, load })
    }

    /// Observe live rainfall, falling back to 0 mm when the service fails.
    pub fn observe_live(&mut self) -> RainfallReading {
        let source = self.config.weather.source(self.config.center.position());
        match source.observe() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("live weather unavailable, assuming no rain: {}", e);
                self.load.degraded.push((DataKind::Weather, e));
                RainfallReading::Observed { millimetres: 0.0, condition: WeatherCondition::Clear }
            }
        }
    }
}

fn file_source(path: Option<&PathBuf>) -> FeatureSource {
    path.map(FeatureSource::file).unwrap_or(FeatureSource::Empty)
}

/// File if configured, else the WFS layer if a key exists, else nothing.
fn layer_source(path: Option<&PathBuf>, config: &Config, layer: &str) -> FeatureSource {
    if let Some(p) = path {
        return FeatureSource::file(p);
    }
    match config.wfs.client() {
        Some(client) => FeatureSource::Wfs { client, layer: layer.to_string() },
        None => FeatureSource::Empty,
    }
}

// ============================================================================
// REPORTS
// ============================================================================

/// A failed collaborator in JSON output.
#[derive(Serialize)]
pub struct JsonDegraded {
    pub source: DataKind,
    pub error: String,
}

/// Load statistics in JSON output.
#[derive(Serialize)]
pub struct JsonLoad {
    pub boundary_rings: usize,
    pub traces_loaded: usize,
    pub traces_outside: usize,
    pub shelters_loaded: usize,
    pub shelters_outside: usize,
    pub degraded: Vec<JsonDegraded>,
}

impl From<&LoadReport> for JsonLoad {
    fn from(report: &LoadReport) -> Self {
        Self {
            boundary_rings: report.boundary_rings,
            traces_loaded: report.traces_loaded,
            traces_outside: report.traces_outside,
            shelters_loaded: report.shelters_loaded,
            shelters_outside: report.shelters_outside,
            degraded: report
                .degraded
                .iter()
                .map(|(source, e)| JsonDegraded {
                    source: *source,
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

/// Snapshot summary in JSON output.
#[derive(Serialize)]
pub struct JsonSnapshot {
    pub generation: u64,
    pub reading: RainfallReading,
    pub severity: Severity,
    pub status: StatusLine,
    pub region: &'static str,
    pub polygons: usize,
    pub area_km2: f64,
    pub reachable: Vec<String>,
    pub flooded: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl From<&Snapshot> for JsonSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            generation: snapshot.generation,
            reading: snapshot.reading,
            severity: snapshot.severity,
            status: snapshot.status(),
            region: snapshot.region.kind(),
            polygons: snapshot.region.polygon_count(),
            area_km2: snapshot.region.area_m2() / 1_000_000.0,
            reachable: snapshot.shelters.reachable.iter().map(|s| s.name.clone()).collect(),
            flooded: snapshot.shelters.flooded.iter().map(|s| s.name.clone()).collect(),
            computed_at: snapshot.computed_at,
        }
    }
}

/// Human-readable snapshot summary, one fact per line.
pub fn print_snapshot(snapshot: &Snapshot, load: &LoadReport) {
    for (source, e) in &load.degraded {
        println!("Warning: {} data unavailable ({})", source.name(), e);
    }
    println!("Rainfall: {} mm ({})", snapshot.reading.millimetres(), snapshot.reading.label());
    println!("{}", snapshot.status().text);
    if snapshot.region.is_none() {
        println!("Danger zone: none");
    } else {
        println!(
            "Danger zone: {}, {} polygons, {:.2} km2",
            snapshot.region.kind(),
            snapshot.region.polygon_count(),
            snapshot.region.area_m2() / 1_000_000.0
        );
    }
    println!(
        "Shelters: {} reachable, {} flooded",
        snapshot.shelters.reachable.len(),
        snapshot.shelters.flooded.len()
    );
    for shelter in &snapshot.shelters.flooded {
        println!("  flooded: {}", shelter.name);
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write the map scene when `--geojson` was given.
pub fn write_scene(path: Option<&Path>, snapshot: &Snapshot, route: Option<&RouteRecord>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let doc = export::scene(snapshot, route);
    fs::write(path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote: {}", path.display());
    Ok(())
}

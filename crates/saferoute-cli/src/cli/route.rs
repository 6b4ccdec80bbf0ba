//! `route` command: evacuation route search from a position.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, ValueEnum};
use log::info;
use serde::Serialize;

use saferoute::{DirectOracle, LatLng, RainfallReading, RouteError, RouteMode, RoutingOracle};

use super::common::{CommonArgs, JsonSnapshot, Session, print_json, write_scene};

/// Exit status when the search ran but selected nothing.
const NO_ROUTE_EXIT: u8 = 2;

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    /// Origin latitude (WGS84)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Origin longitude (WGS84)
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Simulated rainfall in mm (default 0)
    #[arg(short, long, conflicts_with = "live")]
    pub rain: Option<u32>,

    /// Use observed rainfall instead of a simulated amount
    #[arg(long)]
    pub live: bool,

    /// Path source
    #[arg(long, value_enum, default_value_t = RouterKind::Osrm)]
    pub router: RouterKind,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// OSRM road routing over HTTP
    Osrm,
    /// Straight great-circle line, offline
    Direct,
}

#[derive(Serialize)]
struct JsonRoute {
    target: String,
    mode: RouteMode,
    distance_m: f64,
    distance_km: String,
    summary: String,
    points: usize,
}

#[derive(Serialize)]
struct JsonRouteResult {
    origin: LatLng,
    origin_in_danger: bool,
    snapshot: JsonSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<JsonRoute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
}

pub fn cmd_route(common: &CommonArgs, args: &RouteArgs) -> Result<ExitCode> {
    let mut session = Session::open(common)?;
    let reading = if args.live {
        session.observe_live()
    } else {
        RainfallReading::simulated(args.rain.unwrap_or(0))
    };
    let snapshot = session.context.apply_rainfall(reading);

    let oracle: Box<dyn RoutingOracle> = match args.router {
        RouterKind::Osrm => Box::new(session.config.router.oracle()),
        RouterKind::Direct => Box::new(DirectOracle::default()),
    };
    info!("routing with {:?}", args.router);

    let origin = LatLng::new(args.lat, args.lng);
    let origin_in_danger = snapshot.in_danger(origin);
    let outcome: Result<JsonRoute, RouteError> = session
        .context
        .find_route(origin, &oracle)
        .map(|record| JsonRoute {
            target: record.route.target_name.clone(),
            mode: record.route.mode,
            distance_m: record.route.distance_m,
            distance_km: record.route.km(),
            summary: record.route.summary(),
            points: record.route.path.len(),
        });

    let found = outcome.is_ok();
    if common.json {
        let (route, error, error_kind) = match outcome {
            Ok(route) => (Some(route), None, None),
            Err(e) => (None, Some(e.to_string()), Some(e.name())),
        };
        print_json(&JsonRouteResult {
            origin,
            origin_in_danger,
            snapshot: JsonSnapshot::from(&*snapshot),
            route,
            error,
            error_kind,
        })?;
    } else {
        if origin_in_danger {
            println!("Origin is inside the danger zone");
        }
        match &outcome {
            Ok(route) => {
                println!("{}", snapshot.status().text);
                println!("{}", route.summary);
            }
            Err(e) => println!("No route: {}", e),
        }
    }

    write_scene(common.geojson.as_deref(), &snapshot, session.context.current_route())?;

    Ok(if found { ExitCode::SUCCESS } else { ExitCode::from(NO_ROUTE_EXIT) })
}

//! saferoute - flood danger zones and evacuation routes from the command line
//!
//! Usage:
//!   saferoute simulate --rain <mm>              Danger zone for a simulated amount
//!   saferoute live                              Danger zone for observed rainfall
//!   saferoute route --lat <lat> --lng <lng>     Evacuation route from a position
//!   saferoute severity <mm>                     Severity tier for an amount
//!
//! Data comes from `--boundary/--traces/--shelters` GeoJSON files, a
//! `--config` YAML file, or the WFS service when an API key is configured.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cli;

use cli::{CommonArgs, RouteArgs, cmd_live, cmd_route, cmd_severity, cmd_simulate};

#[derive(Parser)]
#[command(name = "saferoute")]
#[command(author, version, about)]
#[command(long_about = "Flood danger-zone simulation and evacuation route safety.\n\n\
    Examples:\n  \
    saferoute --traces traces.geojson simulate --rain 80\n  \
    saferoute --config saferoute.yaml live\n  \
    saferoute route --lat 37.76 --lng 126.78 --rain 90 --router direct\n  \
    saferoute severity 45")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Build the danger zone for a simulated rainfall amount
    Simulate {
        /// Rainfall in millimetres
        #[arg(short, long, default_value_t = 0)]
        rain: u32,
    },

    /// Build the danger zone from currently observed rainfall
    Live,

    /// Search for an evacuation route
    Route(RouteArgs),

    /// Show the severity tier for a rainfall amount
    Severity {
        /// Rainfall in millimetres
        rain: f64,
    },
}

fn init_logging(filter: Option<&str>) {
    let mut builder = match filter {
        Some(f) => {
            let mut b = env_logger::Builder::new();
            b.parse_filters(f);
            b
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")),
    };
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.common.log_level.as_deref());

    let result = match &cli.command {
        Command::Simulate { rain } => cmd_simulate(&cli.common, *rain),
        Command::Live => cmd_live(&cli.common),
        Command::Route(args) => cmd_route(&cli.common, args),
        Command::Severity { rain } => cmd_severity(&cli.common, *rain),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

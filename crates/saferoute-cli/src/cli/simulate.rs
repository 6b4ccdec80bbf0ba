//! `simulate` and `live` commands: one rainfall cycle, reported.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;

use saferoute::RainfallReading;

use super::common::{CommonArgs, JsonLoad, JsonSnapshot, Session, print_json, print_snapshot, write_scene};

#[derive(Serialize)]
struct JsonCycle {
    load: JsonLoad,
    snapshot: JsonSnapshot,
}

pub fn cmd_simulate(args: &CommonArgs, rain: u32) -> Result<ExitCode> {
    let mut session = Session::open(args)?;
    run_cycle(&mut session, args, RainfallReading::simulated(rain))
}

pub fn cmd_live(args: &CommonArgs) -> Result<ExitCode> {
    let mut session = Session::open(args)?;
    let reading = session.observe_live();
    run_cycle(&mut session, args, reading)
}

fn run_cycle(session: &mut Session, args: &CommonArgs, reading: RainfallReading) -> Result<ExitCode> {
    let snapshot = session.context.apply_rainfall(reading);

    if args.json {
        print_json(&JsonCycle {
            load: JsonLoad::from(&session.load),
            snapshot: JsonSnapshot::from(&*snapshot),
        })?;
    } else {
        print_snapshot(&snapshot, &session.load);
    }

    write_scene(args.geojson.as_deref(), &snapshot, None)?;
    Ok(ExitCode::SUCCESS)
}

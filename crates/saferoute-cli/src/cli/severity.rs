//! `severity` command: tier lookup, no data needed.

use std::process::ExitCode;

use anyhow::{Result, bail};
use serde::Serialize;

use saferoute::{Severity, TierStyle};
use saferoute::region::buffer_distance;

use super::common::{CommonArgs, print_json};

#[derive(Serialize)]
struct JsonSeverity {
    rainfall_mm: f64,
    severity: Severity,
    description: String,
    buffer_m: f64,
    style: TierStyle,
}

pub fn cmd_severity(args: &CommonArgs, rain: f64) -> Result<ExitCode> {
    if !(rain >= 0.0) || !rain.is_finite() {
        bail!("rainfall must be a non-negative number of millimetres, got {}", rain);
    }

    let severity = Severity::classify(rain);
    let description = severity.describe(rain);
    let buffer_m = if severity == Severity::Safe { 0.0 } else { buffer_distance(rain) };

    if args.json {
        print_json(&JsonSeverity {
            rainfall_mm: rain,
            severity,
            description,
            buffer_m,
            style: severity.style(),
        })?;
    } else {
        println!("{}", severity.name());
        println!("{}", description);
        if severity != Severity::Safe {
            println!("Buffer: {:.0} m around historical flood traces", buffer_m);
        }
    }
    Ok(ExitCode::SUCCESS)
}

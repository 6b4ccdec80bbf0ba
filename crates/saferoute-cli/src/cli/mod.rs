//! CLI command implementations.
//!
//! This module contains the implementations for the various CLI subcommands:
//! - `simulate` - Build the danger zone for a simulated rainfall amount
//! - `live` - Same, with currently observed rainfall
//! - `route` - Search for an evacuation route from a position
//! - `severity` - Look up the severity tier for a rainfall amount

pub mod common;
pub mod config;
pub mod route;
pub mod severity;
pub mod simulate;

pub use common::CommonArgs;
pub use route::{RouteArgs, cmd_route};
pub use severity::cmd_severity;
pub use simulate::{cmd_live, cmd_simulate};

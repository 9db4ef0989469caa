//! Command-line interface for building and querying Wayfarer route indices.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use serde::Serialize;
use wayfarer_routing::{RouteIndex, read_route_index};

mod build_index;
mod error;
mod plan;
mod query;

pub use error::CliError;

use build_index::BuildIndexArgs;
use plan::PlanArgs;
use query::{NearbyArgs, RouteArgs};

const ARG_DATABASE: &str = "database";
const ARG_INDEX: &str = "index";
const ARG_OUTPUT: &str = "output";
const ARG_GEOHASH_BITS: &str = "geohash-bits";
const ARG_SETTLE_LIMIT: &str = "settle-limit";
const ARG_TRIP: &str = "trip";
const ARG_MAX_CANDIDATES: &str = "max-candidates";
const ARG_RADIUS: &str = "radius";
const ARG_ENTRY_POINTS: &str = "entry-points";
const ARG_FROM: &str = "from";
const ARG_TO: &str = "to";
const ARG_MODE: &str = "mode";
const ARG_LON: &str = "lon";
const ARG_LAT: &str = "lat";
const ENV_BUILD_DATABASE: &str = "WAYFARER_CMDS_BUILD_INDEX_DATABASE";
const ENV_PLAN_TRIP: &str = "WAYFARER_CMDS_PLAN_TRIP";
const ENV_ROUTE_FROM: &str = "WAYFARER_CMDS_ROUTE_FROM";
const ENV_ROUTE_TO: &str = "WAYFARER_CMDS_ROUTE_TO";
const ENV_NEARBY_LON: &str = "WAYFARER_CMDS_NEARBY_LON";
const ENV_NEARBY_LAT: &str = "WAYFARER_CMDS_NEARBY_LAT";

/// Default file name of the SQLite trip store.
const DEFAULT_DATABASE: &str = "trips.db";
/// Default file name of the persisted route index.
const DEFAULT_INDEX: &str = "routes.wyri";

/// Run the Wayfarer CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &mut stdout)
}

fn run_command(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::BuildIndex(args) => build_index::run_build_index(args, writer),
        Command::Plan(args) => plan::run_plan(args, writer),
        Command::Route(args) => query::run_route(args, writer),
        Command::Nearby(args) => query::run_nearby(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "wayfarer",
    about = "Build route indices and plan trips with the Wayfarer engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Contract the stored transit network into a route index artefact.
    BuildIndex(BuildIndexArgs),
    /// Plan a stored trip against a route index.
    Plan(PlanArgs),
    /// Query the shortest routes between two transit vertices.
    Route(RouteArgs),
    /// List transit vertices near a coordinate.
    Nearby(NearbyArgs),
}

/// Fail unless `path` names an existing regular file.
fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match wayfarer_fs::is_regular_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_index(path: &Utf8Path) -> Result<RouteIndex, CliError> {
    require_file(path, ARG_INDEX)?;
    Ok(read_route_index(path.as_std_path())?)
}

fn write_json<T>(writer: &mut dyn Write, value: &T) -> Result<(), CliError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;

//! `route` and `nearby` commands: ad-hoc queries against a route index.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wayfarer_core::{CancellationFlag, GeoPointId, TransportMode};

use crate::{
    ARG_FROM, ARG_INDEX, ARG_LAT, ARG_LON, ARG_MODE, ARG_RADIUS, ARG_TO, CliError, DEFAULT_INDEX,
    ENV_NEARBY_LAT, ENV_NEARBY_LON, ENV_ROUTE_FROM, ENV_ROUTE_TO, load_index, write_json,
};

/// Radius used by `nearby` when none is configured.
const DEFAULT_NEARBY_RADIUS: f64 = 500.0;

/// CLI arguments for the `route` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print every equally short route between two transit \
                 vertices as JSON, unpacked into original edges.",
    about = "Query shortest routes"
)]
#[ortho_config(prefix = "WAYFARER")]
pub(crate) struct RouteArgs {
    /// Source vertex id.
    #[arg(long = ARG_FROM, value_name = "id")]
    #[serde(default)]
    pub(crate) from: Option<u64>,
    /// Destination vertex id.
    #[arg(long = ARG_TO, value_name = "id")]
    #[serde(default)]
    pub(crate) to: Option<u64>,
    /// Transport mode (`walk`, `bus` or `train`; default `walk`).
    #[arg(long = ARG_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<TransportMode>,
    /// Path to the route index artefact (default `routes.wyri`).
    #[arg(long = ARG_INDEX, value_name = "path")]
    #[serde(default)]
    pub(crate) index: Option<Utf8PathBuf>,
}

/// Resolved `route` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RouteConfig {
    pub(crate) from: GeoPointId,
    pub(crate) to: GeoPointId,
    pub(crate) mode: TransportMode,
    pub(crate) index: Utf8PathBuf,
}

impl TryFrom<RouteArgs> for RouteConfig {
    type Error = CliError;

    fn try_from(args: RouteArgs) -> Result<Self, Self::Error> {
        let from = args.from.ok_or(CliError::MissingArgument {
            field: ARG_FROM,
            env: ENV_ROUTE_FROM,
        })?;
        let to = args.to.ok_or(CliError::MissingArgument {
            field: ARG_TO,
            env: ENV_ROUTE_TO,
        })?;
        Ok(Self {
            from: GeoPointId::new(from),
            to: GeoPointId::new(to),
            mode: args.mode.unwrap_or(TransportMode::Walk),
            index: args.index.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_INDEX)),
        })
    }
}

pub(crate) fn run_route(args: RouteArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = RouteConfig::try_from(merged)?;
    let index = load_index(&config.index)?;
    let routes = index.shortest_path(config.from, config.to, config.mode, &CancellationFlag::new())?;
    write_json(writer, &routes)
}

/// CLI arguments for the `nearby` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print the transit vertices within a radius of a \
                 coordinate as JSON, nearest first.",
    about = "List nearby transit vertices"
)]
#[ortho_config(prefix = "WAYFARER")]
pub(crate) struct NearbyArgs {
    /// Longitude of the centre in degrees.
    #[arg(long = ARG_LON, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Latitude of the centre in degrees.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Search radius in metres (default 500).
    #[arg(long = ARG_RADIUS, value_name = "metres")]
    #[serde(default)]
    pub(crate) radius: Option<f64>,
    /// Path to the route index artefact (default `routes.wyri`).
    #[arg(long = ARG_INDEX, value_name = "path")]
    #[serde(default)]
    pub(crate) index: Option<Utf8PathBuf>,
}

/// Resolved `nearby` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearbyConfig {
    pub(crate) centre: Coord<f64>,
    pub(crate) radius: f64,
    pub(crate) index: Utf8PathBuf,
}

impl TryFrom<NearbyArgs> for NearbyConfig {
    type Error = CliError;

    fn try_from(args: NearbyArgs) -> Result<Self, Self::Error> {
        let x = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_LON,
            env: ENV_NEARBY_LON,
        })?;
        let y = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_LAT,
            env: ENV_NEARBY_LAT,
        })?;
        Ok(Self {
            centre: Coord { x, y },
            radius: args.radius.unwrap_or(DEFAULT_NEARBY_RADIUS),
            index: args.index.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_INDEX)),
        })
    }
}

pub(crate) fn run_nearby(args: NearbyArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = NearbyConfig::try_from(merged)?;
    let index = load_index(&config.index)?;
    let points = index.nearby(config.centre, config.radius)?;
    write_json(writer, &points)
}

//! `plan` command: route a stored trip's candidate orders.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wayfarer_core::{TripId, TripPlan};
use wayfarer_routing::PlannerConfig;

use crate::{
    ARG_DATABASE, ARG_ENTRY_POINTS, ARG_INDEX, ARG_MAX_CANDIDATES, ARG_RADIUS, ARG_TRIP,
    CliError, DEFAULT_DATABASE, DEFAULT_INDEX, ENV_PLAN_TRIP, require_file, write_json,
};

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Enumerate the candidate visiting orders of a stored trip, \
                 route each consecutive pair over the route index and print \
                 the plans as JSON, feasible plans first.",
    about = "Plan a stored trip"
)]
#[ortho_config(prefix = "WAYFARER")]
pub(crate) struct PlanArgs {
    /// Identifier of the trip to plan.
    #[arg(long = ARG_TRIP, value_name = "id")]
    #[serde(default)]
    pub(crate) trip: Option<String>,
    /// Path to the SQLite trip store (default `trips.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the route index artefact (default `routes.wyri`).
    #[arg(long = ARG_INDEX, value_name = "path")]
    #[serde(default)]
    pub(crate) index: Option<Utf8PathBuf>,
    /// Candidate orders to route; defaults to the trip kind's cap.
    #[arg(long = ARG_MAX_CANDIDATES, value_name = "count")]
    #[serde(default)]
    pub(crate) max_candidates: Option<usize>,
    /// Radius in metres searched for route entry points.
    #[arg(long = ARG_RADIUS, value_name = "metres")]
    #[serde(default)]
    pub(crate) radius: Option<f64>,
    /// Entry points kept per stop.
    #[arg(long = ARG_ENTRY_POINTS, value_name = "count")]
    #[serde(default)]
    pub(crate) entry_points: Option<usize>,
}

impl PlanArgs {
    fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanConfig {
    pub(crate) trip: TripId,
    pub(crate) database: Utf8PathBuf,
    pub(crate) index: Utf8PathBuf,
    pub(crate) max_candidates: Option<usize>,
    pub(crate) planner: PlannerConfig,
}

impl PlanConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        require_file(&self.database, ARG_DATABASE)?;
        require_file(&self.index, ARG_INDEX)
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let trip = args.trip.ok_or(CliError::MissingArgument {
            field: ARG_TRIP,
            env: ENV_PLAN_TRIP,
        })?;
        let defaults = PlannerConfig::default();
        Ok(Self {
            trip: TripId::new(trip),
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            index: args.index.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_INDEX)),
            max_candidates: args.max_candidates,
            planner: PlannerConfig {
                radius: args.radius.unwrap_or(defaults.radius),
                max_entry_points: args.entry_points.unwrap_or(defaults.max_entry_points),
            },
        })
    }
}

pub(crate) fn run_plan(args: PlanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let plans = plan(&config)?;
    write_json(writer, &plans)
}

#[cfg(feature = "store-sqlite")]
fn plan(config: &PlanConfig) -> Result<Vec<TripPlan>, CliError> {
    use std::sync::Arc;

    use log::info;
    use wayfarer_core::{
        CancellationFlag, PointRepository, SqliteTripStore, TripKind, TripPlanner,
    };
    use wayfarer_routing::{ContractionPlanner, RouteIndexHandle};

    use crate::load_index;

    let index = load_index(&config.index)?;
    let store = Arc::new(SqliteTripStore::open(
        config.database.as_std_path(),
        *index.geo().grid(),
    )?);
    let limit = match config.max_candidates {
        Some(limit) => limit,
        None => store
            .trip(&config.trip)?
            .map_or(TripKind::default(), |trip| trip.kind)
            .max_candidates(),
    };
    let handle = Arc::new(RouteIndexHandle::new(index));
    let planner = ContractionPlanner::with_config(store, handle, config.planner);
    let plans = planner.plan_trip(&config.trip, limit, &CancellationFlag::new())?;
    info!(
        "trip {} has {} plans, {} feasible",
        config.trip,
        plans.len(),
        plans.iter().filter(|plan| plan.is_feasible()).count()
    );
    Ok(plans)
}

#[cfg(not(feature = "store-sqlite"))]
fn plan(_config: &PlanConfig) -> Result<Vec<TripPlan>, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "planning a trip",
    })
}

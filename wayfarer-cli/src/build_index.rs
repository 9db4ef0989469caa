//! `build-index` command: contract the stored network into an artefact.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wayfarer_core::{GeohashGrid, TransportMode};
use wayfarer_routing::ContractionConfig;

use crate::{
    ARG_DATABASE, ARG_GEOHASH_BITS, ARG_OUTPUT, ARG_SETTLE_LIMIT, CliError, DEFAULT_INDEX,
    ENV_BUILD_DATABASE, require_file, write_json,
};

/// CLI arguments for the `build-index` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read the transit vertices and edges from a SQLite trip \
                 store, contract one graph per transport mode and write the \
                 route index artefact queried by `plan`, `route` and \
                 `nearby`.",
    about = "Build the route index artefact"
)]
#[ortho_config(prefix = "WAYFARER")]
pub(crate) struct BuildIndexArgs {
    /// Path to the SQLite trip store.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Destination of the route index artefact (default `routes.wyri`).
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Geohash bit length the store's cell column was written with.
    #[arg(long = ARG_GEOHASH_BITS, value_name = "bits")]
    #[serde(default)]
    pub(crate) geohash_bits: Option<u32>,
    /// Vertices a witness search may settle before keeping a shortcut.
    #[arg(long = ARG_SETTLE_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) settle_limit: Option<usize>,
}

impl BuildIndexArgs {
    fn into_config(self) -> Result<BuildIndexConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BuildIndexConfig::try_from(merged)
    }
}

/// Resolved `build-index` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildIndexConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) grid: GeohashGrid,
    pub(crate) contraction: ContractionConfig,
}

impl BuildIndexConfig {
    fn validate_sources(&self) -> Result<(), CliError> {
        require_file(&self.database, ARG_DATABASE)?;
        wayfarer_fs::create_parent_dirs(&self.output).map_err(|source| {
            CliError::CreateOutputDirectory {
                path: self.output.clone(),
                source,
            }
        })
    }
}

impl TryFrom<BuildIndexArgs> for BuildIndexConfig {
    type Error = CliError;

    fn try_from(args: BuildIndexArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_BUILD_DATABASE,
        })?;
        let output = args
            .output
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_INDEX));
        let grid = args
            .geohash_bits
            .map(GeohashGrid::new)
            .transpose()?
            .unwrap_or_default();
        let mut contraction = ContractionConfig::default();
        if let Some(limit) = args.settle_limit {
            contraction.settle_limit = limit;
        }
        Ok(Self {
            database,
            output,
            grid,
            contraction,
        })
    }
}

/// Summary printed after a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BuildSummary {
    pub(crate) output: Utf8PathBuf,
    pub(crate) vertices: usize,
    pub(crate) edges: usize,
    pub(crate) modes: Vec<TransportMode>,
    pub(crate) shortcuts: usize,
}

pub(crate) fn run_build_index(args: BuildIndexArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summary = build(&config)?;
    write_json(writer, &summary)
}

#[cfg(feature = "store-sqlite")]
fn build(config: &BuildIndexConfig) -> Result<BuildSummary, CliError> {
    use log::info;
    use wayfarer_core::{CancellationFlag, SqliteTripStore};
    use wayfarer_routing::{RouteIndex, write_route_index};

    let store = SqliteTripStore::open(config.database.as_std_path(), config.grid)?;
    let vertices = store.load_geo_points()?;
    let edges = store.load_edges()?;
    info!(
        "loaded {} vertices and {} edges from {}",
        vertices.len(),
        edges.len(),
        config.database
    );
    let index = RouteIndex::build(
        vertices,
        &edges,
        config.grid,
        &config.contraction,
        &CancellationFlag::new(),
    )?;
    write_route_index(config.output.as_std_path(), &index)?;

    let modes: Vec<TransportMode> = index.modes().collect();
    let shortcuts = modes
        .iter()
        .filter_map(|&mode| index.graph(mode))
        .map(wayfarer_routing::ContractedGraph::shortcut_count)
        .sum();
    Ok(BuildSummary {
        output: config.output.clone(),
        vertices: index.geo().len(),
        edges: edges.len(),
        modes,
        shortcuts,
    })
}

#[cfg(not(feature = "store-sqlite"))]
fn build(_config: &BuildIndexConfig) -> Result<BuildSummary, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "building a route index",
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<BuildIndexConfig, CliError> {
    let merged = BuildIndexArgs::merge_from_layers(layers).map_err(CliError::from)?;
    BuildIndexConfig::try_from(merged)
}

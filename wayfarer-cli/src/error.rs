//! Error types emitted by the Wayfarer CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
#[cfg(feature = "store-sqlite")]
use wayfarer_core::SqliteTripStoreError;
use wayfarer_core::{Cancelled, GeohashError, NearbyError, PlanError, StoreError};
use wayfarer_routing::{QueryError, RouteIndexError, RouteIndexWriteError};

/// Errors emitted by the Wayfarer CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The directory for an output artefact could not be created.
    #[error("failed to create output directory for {path:?}: {source}")]
    CreateOutputDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The requested geohash length is unsupported.
    #[error(transparent)]
    InvalidGeohash(#[from] GeohashError),
    /// Opening or reading the SQLite trip store failed.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    OpenStore(#[from] SqliteTripStoreError),
    /// A repository lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Building the route index was interrupted.
    #[error("route index build {0}")]
    Cancelled(#[from] Cancelled),
    /// Writing the route index artefact failed.
    #[error(transparent)]
    WriteIndex(#[from] RouteIndexWriteError),
    /// Loading the route index artefact failed.
    #[error(transparent)]
    ReadIndex(#[from] RouteIndexError),
    /// Planning the trip failed.
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
    /// A route query failed.
    #[error(transparent)]
    Route(#[from] QueryError),
    /// A proximity query failed.
    #[error(transparent)]
    Nearby(#[from] NearbyError),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

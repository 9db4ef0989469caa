//! Immutable route index and its atomically swapped handle.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use geo::Coord;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use wayfarer_core::{
    CancellationFlag, Cancelled, GeoEdge, GeoIndex, GeoPoint, GeoPointId, GeohashGrid,
    NearbyError, RoutePath, TransportMode,
};

use crate::graph::ContractedGraph;
use crate::preprocess::{ContractionConfig, contract};
use crate::query::{QueryError, shortest_paths};

/// Everything query-time components read: the vertex proximity index and
/// one contracted graph per transport mode.
///
/// A built index is never mutated. Rebuilds produce a new value that is
/// swapped in through [`RouteIndexHandle::publish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteIndex {
    version: u64,
    geo: GeoIndex,
    graphs: BTreeMap<TransportMode, ContractedGraph>,
}

impl RouteIndex {
    /// Contract `edges` once per transport mode they carry and bucket
    /// `vertices` on `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` is raised during contraction.
    pub fn build<I>(
        vertices: I,
        edges: &[GeoEdge],
        grid: GeohashGrid,
        config: &ContractionConfig,
        cancel: &CancellationFlag,
    ) -> Result<Self, Cancelled>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let geo = GeoIndex::from_points(grid, vertices);
        let ids: Vec<GeoPointId> = geo.iter().map(|point| point.id).collect();
        let modes: BTreeSet<TransportMode> = edges
            .iter()
            .flat_map(|edge| edge.costs.iter().map(|&(mode, _)| mode))
            .collect();

        let mut graphs = BTreeMap::new();
        for mode in modes {
            let graph = contract(ids.iter().copied(), edges, mode, config, cancel)?;
            graphs.insert(mode, graph);
        }
        info!(
            "built route index over {} vertices and {} edges for {} modes",
            geo.len(),
            edges.len(),
            graphs.len()
        );
        Ok(Self {
            version: 0,
            geo,
            graphs,
        })
    }

    /// Publication version; `0` until the index is published.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Proximity index over the transit vertices.
    #[must_use]
    pub const fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    /// Contracted graph for `mode`, if any edge carries that mode.
    #[must_use]
    pub fn graph(&self, mode: TransportMode) -> Option<&ContractedGraph> {
        self.graphs.get(&mode)
    }

    /// Modes with a contracted graph, in ascending order.
    pub fn modes(&self) -> impl Iterator<Item = TransportMode> + '_ {
        self.graphs.keys().copied()
    }

    /// Transit vertices within `radius` metres of `query`, nearest first.
    ///
    /// # Errors
    ///
    /// See [`GeoIndex::nearby`].
    pub fn nearby_points(&self, query: &GeoPoint, radius: f64) -> Result<Vec<GeoPoint>, NearbyError> {
        self.geo.nearby(query.location, radius)
    }

    /// Transit vertices within `radius` metres of `centre`, nearest first.
    ///
    /// # Errors
    ///
    /// See [`GeoIndex::nearby`].
    pub fn nearby(&self, centre: Coord<f64>, radius: f64) -> Result<Vec<GeoPoint>, NearbyError> {
        self.geo.nearby(centre, radius)
    }

    /// All equally short `mode` routes from `source` to `target`.
    ///
    /// A mode without a contracted graph yields no routes.
    ///
    /// # Errors
    ///
    /// See [`shortest_paths`].
    pub fn shortest_path(
        &self,
        source: GeoPointId,
        target: GeoPointId,
        mode: TransportMode,
        cancel: &CancellationFlag,
    ) -> Result<Vec<RoutePath>, QueryError> {
        let Some(graph) = self.graphs.get(&mode) else {
            warn!("no {mode} graph in route index version {}", self.version);
            return Ok(Vec::new());
        };
        shortest_paths(graph, source, target, cancel)
    }
}

/// Shared pointer to the currently published [`RouteIndex`].
///
/// Readers take a snapshot with [`current`](Self::current) and keep using
/// it for the whole request, so a concurrent [`publish`](Self::publish)
/// never changes the index under them.
#[derive(Debug)]
pub struct RouteIndexHandle {
    current: RwLock<Arc<RouteIndex>>,
}

impl RouteIndexHandle {
    /// Publish `index` as the first version.
    #[must_use]
    pub fn new(mut index: RouteIndex) -> Self {
        index.version = index.version.max(1);
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// Snapshot of the published index.
    #[must_use]
    pub fn current(&self) -> Arc<RouteIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the published index and return its new version.
    ///
    /// Versions increase strictly with every publication.
    pub fn publish(&self, mut index: RouteIndex) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        index.version = guard.version.saturating_add(1);
        let version = index.version;
        *guard = Arc::new(index);
        drop(guard);
        info!("published route index version {version}");
        version
    }
}

//! Radius queries over geohash-bucketed transit vertices.
//!
//! A query turns its disc into a box of grid cells (see
//! [`GeohashGrid::search_area`]), fetches every vertex stored in those cells
//! and keeps the ones whose haversine distance is within the radius.

use std::collections::HashMap;

use geo::{Coord, Distance, Haversine, Point};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellId, GeoPoint, GeoPointId, GeoPointRepository, GeohashGrid, StoreError};

/// Default ceiling on the number of cells a single query may visit.
pub const DEFAULT_MAX_CELLS: u64 = 1_000_000;

/// Errors returned by proximity queries.
#[derive(Debug, Error)]
pub enum NearbyError {
    /// The radius was negative or not a number.
    #[error("search radius must be a non-negative number of metres, got {radius}")]
    InvalidRadius {
        /// Rejected radius.
        radius: f64,
    },
    /// The radius covers more cells than the configured ceiling.
    #[error("search area spans {cells} cells, above the limit of {limit}")]
    SearchAreaTooLarge {
        /// Cells the query would visit.
        cells: u64,
        /// Configured ceiling.
        limit: u64,
    },
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Radius search over any hashed vertex store.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayfarer_core::{GeoIndex, GeoPoint, GeoPointId, GeohashGrid, ProximitySearch};
///
/// let grid = GeohashGrid::default();
/// let index = GeoIndex::from_points(
///     grid,
///     [
///         GeoPoint::new(GeoPointId::new(1), Coord { x: -0.1280, y: 51.5080 }),
///         GeoPoint::new(GeoPointId::new(2), Coord { x: -0.0760, y: 51.5081 }),
///     ],
/// );
/// let search = ProximitySearch::new(grid);
/// let found = search.nearby(&index, Coord { x: -0.1275, y: 51.5079 }, 500.0)?;
/// assert_eq!(found.iter().map(|p| p.id.get()).collect::<Vec<_>>(), vec![1]);
/// # Ok::<(), wayfarer_core::NearbyError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximitySearch {
    grid: GeohashGrid,
    max_cells: u64,
}

impl Default for ProximitySearch {
    fn default() -> Self {
        Self::new(GeohashGrid::default())
    }
}

impl ProximitySearch {
    /// Search cells of `grid` with the default cell ceiling.
    pub const fn new(grid: GeohashGrid) -> Self {
        Self {
            grid,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }

    /// Override the cell ceiling.
    #[must_use]
    pub const fn with_max_cells(mut self, max_cells: u64) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// Grid used to hash queries.
    pub const fn grid(&self) -> &GeohashGrid {
        &self.grid
    }

    /// Every stored vertex within `radius` metres of `centre`, nearest
    /// first. Ties are ordered by vertex id.
    pub fn nearby<S>(
        &self,
        store: &S,
        centre: Coord<f64>,
        radius: f64,
    ) -> Result<Vec<GeoPoint>, NearbyError>
    where
        S: GeoPointRepository + ?Sized,
    {
        if radius.is_nan() || radius < 0.0 {
            return Err(NearbyError::InvalidRadius { radius });
        }
        let area = self.grid.search_area(centre, radius);
        let cells = area.cell_count();
        if cells > self.max_cells {
            return Err(NearbyError::SearchAreaTooLarge {
                cells,
                limit: self.max_cells,
            });
        }

        let cell_ids: Vec<CellId> = area.cells().collect();
        let candidates = store.geo_points_with_hashes(&cell_ids)?;
        let scanned = candidates.len();
        let origin = Point::from(centre);
        let mut found: Vec<(f64, GeoPoint)> = candidates
            .into_iter()
            .map(|point| (Haversine.distance(origin, point.point()), point))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        found.sort_by(|(left, a), (right, b)| left.total_cmp(right).then(a.id.cmp(&b.id)));
        debug!(
            "proximity query visited {cells} cells, kept {} of {scanned} candidates",
            found.len()
        );
        Ok(found.into_iter().map(|(_, point)| point).collect())
    }

    /// Every stored vertex within `radius` metres of `query`.
    pub fn nearby_points<S>(
        &self,
        store: &S,
        query: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<GeoPoint>, NearbyError>
    where
        S: GeoPointRepository + ?Sized,
    {
        self.nearby(store, query.location, radius)
    }
}

/// In-memory vertex store bucketed by grid cell.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoIndex {
    grid: GeohashGrid,
    buckets: HashMap<CellId, Vec<GeoPoint>>,
    cells: HashMap<GeoPointId, CellId>,
}

impl GeoIndex {
    /// Create an empty index over `grid`.
    pub fn new(grid: GeohashGrid) -> Self {
        Self {
            grid,
            buckets: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    /// Build an index from `points`, re-hashing each with `grid`.
    pub fn from_points<I>(grid: GeohashGrid, points: I) -> Self
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut index = Self::new(grid);
        for point in points {
            index.insert(point);
        }
        index
    }

    /// Insert or replace a vertex.
    pub fn insert(&mut self, mut point: GeoPoint) {
        point.rehash(&self.grid);
        self.remove(point.id);
        self.cells.insert(point.id, point.cell);
        let bucket = self.buckets.entry(point.cell).or_default();
        let position = bucket.partition_point(|existing| existing.id < point.id);
        bucket.insert(position, point);
    }

    /// Remove a vertex, returning it if present.
    pub fn remove(&mut self, id: GeoPointId) -> Option<GeoPoint> {
        let cell = self.cells.remove(&id)?;
        let bucket = self.buckets.get_mut(&cell)?;
        let position = bucket.iter().position(|point| point.id == id)?;
        let removed = bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&cell);
        }
        Some(removed)
    }

    /// Grid used to bucket vertices.
    pub const fn grid(&self) -> &GeohashGrid {
        &self.grid
    }

    /// Number of stored vertices.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a vertex by id.
    pub fn get(&self, id: GeoPointId) -> Option<&GeoPoint> {
        let cell = self.cells.get(&id)?;
        self.buckets.get(cell)?.iter().find(|point| point.id == id)
    }

    /// Iterate over all vertices in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &GeoPoint> {
        self.buckets.values().flatten()
    }

    /// Vertices within `radius` metres of `centre`, nearest first.
    pub fn nearby(&self, centre: Coord<f64>, radius: f64) -> Result<Vec<GeoPoint>, NearbyError> {
        ProximitySearch::new(self.grid).nearby(self, centre, radius)
    }
}

impl GeoPointRepository for GeoIndex {
    fn geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, StoreError> {
        Ok(self.get(id).cloned())
    }

    fn geo_points_with_hashes(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError> {
        let mut points: Vec<GeoPoint> = cells
            .iter()
            .filter_map(|cell| self.buckets.get(cell))
            .flatten()
            .cloned()
            .collect();
        points.sort_by_key(|point| point.id);
        points.dedup_by_key(|point| point.id);
        Ok(points)
    }
}

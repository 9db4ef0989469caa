//! Data access traits for trips, points and transit vertices.
//!
//! Planning reads everything through these read-only repositories so the
//! same core runs against SQLite, the in-memory [`GeoIndex`] or test
//! doubles.
//!
//! [`GeoIndex`]: crate::GeoIndex

use std::sync::Arc;

use thiserror::Error;

use crate::{CellId, GeoPoint, GeoPointId, Point, Trip, TripId};

#[cfg(feature = "store-sqlite")]
pub(crate) mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteTripStore, SqliteTripStoreError};

/// Error raised by a repository backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to answer the query.
    #[error("store backend failed: {source}")]
    Backend {
        /// Backend-specific failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a backend-specific error.
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            source: Box::new(source),
        }
    }
}

/// Read-only access to trips and their points.
pub trait PointRepository {
    /// Fetch a trip, or `None` when it does not exist.
    fn trip(&self, id: &TripId) -> Result<Option<Trip>, StoreError>;

    /// List every point belonging to `trip` in a stable order.
    fn list_points(&self, trip: &TripId) -> Result<Vec<Point>, StoreError>;
}

/// Read-only access to hashed transit vertices.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use wayfarer_core::{GeoIndex, GeoPoint, GeoPointId, GeoPointRepository, GeohashGrid};
///
/// let grid = GeohashGrid::default();
/// let station = GeoPoint::new(GeoPointId::new(1), Coord { x: 0.1, y: 51.5 });
/// let index = GeoIndex::from_points(grid, [station.clone()]);
///
/// let found = index.geo_points_with_hashes(&[station.cell])?;
/// assert_eq!(found, vec![station]);
/// # Ok::<(), wayfarer_core::StoreError>(())
/// ```
pub trait GeoPointRepository {
    /// Fetch a vertex by id, or `None` when it does not exist.
    fn geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, StoreError>;

    /// Return every vertex whose cell is listed in `cells`, ordered by id.
    fn geo_points_with_hashes(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError>;
}

impl<T: PointRepository + ?Sized> PointRepository for Arc<T> {
    fn trip(&self, id: &TripId) -> Result<Option<Trip>, StoreError> {
        (**self).trip(id)
    }

    fn list_points(&self, trip: &TripId) -> Result<Vec<Point>, StoreError> {
        (**self).list_points(trip)
    }
}

impl<T: GeoPointRepository + ?Sized> GeoPointRepository for Arc<T> {
    fn geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, StoreError> {
        (**self).geo_point(id)
    }

    fn geo_points_with_hashes(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError> {
        (**self).geo_points_with_hashes(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingStore, MemoryTripStore};
    use crate::{GeoPointId, TransportMode};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    fn arc_forwards_to_inner_repository() {
        let trip = Trip::new(
            TripId::from("t"),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            TransportMode::Bus,
        );
        let store = Arc::new(MemoryTripStore::default().with_trip(
            trip.clone(),
            [Point::new("a", trip.id.clone(), GeoPointId::new(1))],
        ));
        assert_eq!(store.trip(&trip.id).expect("trip lookup"), Some(trip.clone()));
        assert_eq!(store.list_points(&trip.id).expect("point lookup").len(), 1);
        assert_eq!(store.trip(&TripId::from("missing")).expect("lookup"), None);
    }

    #[rstest]
    fn backend_errors_keep_their_source() {
        let err = FailingStore.list_points(&TripId::from("t")).unwrap_err();
        assert!(err.to_string().starts_with("store backend failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

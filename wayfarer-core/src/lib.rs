//! Core domain types for the Wayfarer trip planner.
//!
//! This crate owns everything that does not depend on the routing index:
//! trips and their points, structural validation of ordering constraints,
//! candidate order enumeration, the geohash proximity index and the
//! read-only repositories that feed them. Route computation lives in
//! `wayfarer-routing` behind the [`TripPlanner`] trait.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use wayfarer_core::{
//!     CancellationFlag, ConstraintGraph, GeoPointId, Point, PointId, TripId,
//!     enumerate_orders,
//! };
//!
//! let trip = TripId::from("day-out");
//! let points = vec![
//!     Point::new("a", trip.clone(), GeoPointId::new(1)).as_first(),
//!     Point::new("b", trip.clone(), GeoPointId::new(2)),
//!     Point::new("c", trip, GeoPointId::new(3)).as_last(),
//! ];
//! let graph = ConstraintGraph::build(points)?;
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
//! let orders = enumerate_orders(&graph, start, 10, &CancellationFlag::new())?;
//! let ids: Vec<&str> = orders[0].points().iter().map(PointId::as_str).collect();
//! assert_eq!(ids, ["a", "b", "c"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cancel;
mod constraints;
mod edge;
mod enumerate;
mod geo_point;
mod geohash;
mod ids;
mod plan;
mod point;
mod proximity;
mod route;
pub mod store;
mod trip;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cancel::{CancellationFlag, Cancelled};
pub use constraints::{ConstraintGraph, StructuralError};
pub use edge::{Cost, GeoEdge, TransportMode};
pub use enumerate::enumerate_orders;
pub use geo_point::{Address, GeoPoint, Tags};
pub use geohash::{CellId, GeohashError, GeohashGrid, MEAN_EARTH_RADIUS_METRES, SearchArea};
pub use ids::{EdgeId, GeoPointId, PointId, TripId};
pub use plan::{Leg, PlanError, PlanStatus, TripPlan, TripPlanner};
pub use point::{Point, PointOrder};
pub use proximity::{DEFAULT_MAX_CELLS, GeoIndex, NearbyError, ProximitySearch};
pub use route::RoutePath;
pub use store::{GeoPointRepository, PointRepository, StoreError};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteTripStore, SqliteTripStoreError};
pub use trip::{Trip, TripKind};

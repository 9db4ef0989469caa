//! Test-only, in-memory repositories and sample data used by unit and
//! behaviour tests.

use std::collections::HashMap;

use crate::{
    CellId, GeoIndex, GeoPoint, GeoPointId, GeoPointRepository, Point, PointRepository,
    StoreError, Trip, TripId,
};

#[cfg(feature = "store-sqlite")]
pub use sqlite_fixture::{SqliteFixture, sample_network};

/// In-memory repository of trips, points and geo points used in tests.
#[derive(Default, Debug, Clone)]
pub struct MemoryTripStore {
    trips: HashMap<TripId, Trip>,
    points: HashMap<TripId, Vec<Point>>,
    geo: GeoIndex,
}

impl MemoryTripStore {
    /// Add a trip together with its points.
    #[must_use]
    pub fn with_trip<I>(mut self, trip: Trip, points: I) -> Self
    where
        I: IntoIterator<Item = Point>,
    {
        self.points
            .insert(trip.id.clone(), points.into_iter().collect());
        self.trips.insert(trip.id.clone(), trip);
        self
    }

    /// Add geo points, replacing any with the same id.
    #[must_use]
    pub fn with_geo_points<I>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        for point in points {
            self.geo.insert(point);
        }
        self
    }
}

impl PointRepository for MemoryTripStore {
    fn trip(&self, id: &TripId) -> Result<Option<Trip>, StoreError> {
        Ok(self.trips.get(id).cloned())
    }

    fn list_points(&self, trip: &TripId) -> Result<Vec<Point>, StoreError> {
        Ok(self.points.get(trip).cloned().unwrap_or_default())
    }
}

impl GeoPointRepository for MemoryTripStore {
    fn geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, StoreError> {
        self.geo.geo_point(id)
    }

    fn geo_points_with_hashes(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError> {
        self.geo.geo_points_with_hashes(cells)
    }
}

/// Repository whose every query fails.
#[derive(Default, Debug, Copy, Clone)]
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::backend(std::io::Error::other("store unavailable"))
}

impl PointRepository for FailingStore {
    fn trip(&self, _id: &TripId) -> Result<Option<Trip>, StoreError> {
        Err(unavailable())
    }

    fn list_points(&self, _trip: &TripId) -> Result<Vec<Point>, StoreError> {
        Err(unavailable())
    }
}

impl GeoPointRepository for FailingStore {
    fn geo_point(&self, _id: GeoPointId) -> Result<Option<GeoPoint>, StoreError> {
        Err(unavailable())
    }

    fn geo_points_with_hashes(&self, _cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError> {
        Err(unavailable())
    }
}

#[cfg(feature = "store-sqlite")]
mod sqlite_fixture {
    use std::path::Path;
    use std::time::Duration;

    use chrono::{TimeDelta, TimeZone, Utc};
    use geo::Coord;
    use rusqlite::{Connection, params};

    use super::MemoryTripStore;
    use crate::store::sqlite::SCHEMA;
    use crate::{
        Address, Cost, EdgeId, GeoEdge, GeoIndex, GeoPoint, GeoPointId, GeohashGrid, Point,
        TransportMode, Trip, TripId, TripKind,
    };

    /// A small transit network and one trip over it.
    #[derive(Debug, Clone)]
    pub struct SqliteFixture {
        /// Grid used to hash `geo_points`.
        pub grid: GeohashGrid,
        /// The trip.
        pub trip: Trip,
        /// The trip's points in insertion order.
        pub points: Vec<Point>,
        /// Transit vertices ordered by id.
        pub geo_points: Vec<GeoPoint>,
        /// Transit edges ordered by id.
        pub edges: Vec<GeoEdge>,
    }

    impl SqliteFixture {
        /// Write the fixture to a new SQLite database at `path`.
        pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let connection = Connection::open(path)?;
            connection.execute_batch(SCHEMA)?;
            let kind = match self.trip.kind {
                TripKind::Anonymous => "anonymous",
                TripKind::Registered => "registered",
            };
            connection.execute(
                "INSERT INTO trips (id, kind, start, budget, preferred_mode)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    self.trip.id.as_str(),
                    kind,
                    self.trip.start.to_rfc3339(),
                    self.trip.budget.map(Cost::get),
                    self.trip.preferred_mode.as_str(),
                ],
            )?;
            for point in &self.points {
                connection.execute(
                    "INSERT INTO points (id, trip_id, geo_point_id, duration_secs, deadline,
                                         before_ids, after_ids, is_first, is_last)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        point.id.as_str(),
                        point.trip_id.as_str(),
                        point.geo_point_id.get(),
                        point.duration.map(|d| d.as_secs()),
                        point.deadline.map(|d| d.to_rfc3339()),
                        serde_json::to_string(&point.before)?,
                        serde_json::to_string(&point.after)?,
                        point.first,
                        point.last,
                    ],
                )?;
            }
            for vertex in &self.geo_points {
                connection.execute(
                    "INSERT INTO geo_points (id, lon, lat, cell, name, address, tags)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        vertex.id.get(),
                        vertex.location.x,
                        vertex.location.y,
                        vertex.cell.get(),
                        vertex.name,
                        serde_json::to_string(&vertex.address)?,
                        serde_json::to_string(&vertex.tags)?,
                    ],
                )?;
            }
            for edge in &self.edges {
                connection.execute(
                    "INSERT INTO edges (id, source, target, costs) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        edge.id.get(),
                        edge.from.get(),
                        edge.to.get(),
                        serde_json::to_string(&edge.costs)?,
                    ],
                )?;
            }
            Ok(())
        }

        /// The trip, its points and the stations as an in-memory repository.
        pub fn memory_store(&self) -> MemoryTripStore {
            MemoryTripStore::default()
                .with_trip(self.trip.clone(), self.points.clone())
                .with_geo_points(self.geo_points.clone())
        }

        /// The transit vertices as an in-memory index.
        pub fn geo_index(&self) -> GeoIndex {
            GeoIndex::from_points(self.grid, self.geo_points.clone())
        }
    }

    fn station(id: u64, name: &str, lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(GeoPointId::new(id), Coord { x: lon, y: lat })
            .with_name(name)
            .with_address(Address {
                prefecture: Some(String::from("Tokyo")),
                city: Some(String::from("Chiyoda")),
                ..Address::default()
            })
            .with_tag("railway", "station")
    }

    fn both_ways(id: u64, a: u64, b: u64, costs: &[(TransportMode, u64)]) -> [GeoEdge; 2] {
        let build = |edge_id: u64, from: u64, to: u64| {
            costs.iter().fold(
                GeoEdge::new(EdgeId::new(edge_id), GeoPointId::new(from), GeoPointId::new(to)),
                |edge, &(mode, cost)| edge.with_cost(mode, Cost::new(cost)),
            )
        };
        [build(2 * id - 1, a, b), build(2 * id, b, a)]
    }

    /// Six stations around Tokyo station joined by walking paths and a
    /// rail line, plus a four-stop trip that starts at the hotel next to
    /// station 1 and ends at station 5.
    ///
    /// Cheapest walking costs between stations:
    ///
    /// | from\to | 1  | 2  | 3  | 4  | 5  | 6  |
    /// |---------|----|----|----|----|----|----|
    /// | 1       | 0  | 14 | 24 | 9  | 20 | 11 |
    pub fn sample_network() -> SqliteFixture {
        use TransportMode::{Train, Walk};

        let geo_points = vec![
            station(1, "Tokyo", 139.7671, 35.6812),
            station(2, "Kanda", 139.7707, 35.6918),
            station(3, "Akihabara", 139.7740, 35.6984),
            station(4, "Yurakucho", 139.7630, 35.6751),
            station(5, "Shimbashi", 139.7583, 35.6664),
            station(6, "Ginza", 139.7640, 35.6717),
        ];
        let edges = [
            both_ways(1, 1, 2, &[(Walk, 14), (Train, 3)]),
            both_ways(2, 2, 3, &[(Walk, 10), (Train, 2)]),
            both_ways(3, 1, 4, &[(Walk, 9), (Train, 2)]),
            both_ways(4, 4, 5, &[(Walk, 12), (Train, 3)]),
            both_ways(5, 4, 6, &[(Walk, 4)]),
            both_ways(6, 6, 5, &[(Walk, 9)]),
            both_ways(7, 1, 6, &[(Walk, 11)]),
        ]
        .into_iter()
        .flatten()
        .collect();

        let start = Utc
            .with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let trip_id = TripId::from("tokyo-day");
        let trip = Trip::new(trip_id.clone(), start, Walk)
            .with_kind(TripKind::Registered)
            .with_budget(Cost::new(70));
        let points = vec![
            Point::new("hotel", trip_id.clone(), GeoPointId::new(1)).as_first(),
            Point::new("museum", trip_id.clone(), GeoPointId::new(3))
                .with_duration(Duration::from_secs(2 * 3_600)),
            Point::new("gallery", trip_id.clone(), GeoPointId::new(6))
                .with_duration(Duration::from_secs(3_600))
                .with_deadline(start + TimeDelta::hours(4)),
            Point::new("dinner", trip_id, GeoPointId::new(5)).as_last(),
        ];

        SqliteFixture {
            grid: GeohashGrid::default(),
            trip,
            points,
            geo_points,
            edges,
        }
    }
}

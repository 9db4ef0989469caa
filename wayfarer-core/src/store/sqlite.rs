//! SQLite-backed store for trips, points and the transit graph.
//!
//! The database holds four tables:
//!
//! - `trips (id, kind, start, budget, preferred_mode)`, with `start` as an
//!   RFC 3339 timestamp;
//! - `points (id, trip_id, geo_point_id, duration_secs, deadline,
//!   before_ids, after_ids, is_first, is_last)`, with the id lists as JSON
//!   arrays;
//! - `geo_points (id, lon, lat, cell, name, address, tags)`, with `cell`
//!   hashed by the grid the store is opened with and `address`/`tags` as
//!   JSON objects;
//! - `edges (id, source, target, costs)`, with `costs` as a JSON array of
//!   `[mode, cost]` pairs.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use geo::Coord;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};
use thiserror::Error;

use crate::{
    Address, CellId, Cost, EdgeId, GeoEdge, GeoPoint, GeoPointId, GeohashGrid, Point, PointId,
    Tags, TransportMode, Trip, TripId, TripKind,
};

use super::{GeoPointRepository, PointRepository, StoreError};

/// SQLite limits bound parameters per statement to 999 by default. The store
/// chunks `IN` queries to remain below that ceiling.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

/// Statements creating the schema read by [`SqliteTripStore`].
#[cfg(any(test, feature = "test-support"))]
pub(crate) const SCHEMA: &str = "
    CREATE TABLE trips (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        start TEXT NOT NULL,
        budget INTEGER,
        preferred_mode TEXT NOT NULL
    );
    CREATE TABLE points (
        id TEXT NOT NULL,
        trip_id TEXT NOT NULL,
        geo_point_id INTEGER NOT NULL,
        duration_secs INTEGER,
        deadline TEXT,
        before_ids TEXT NOT NULL DEFAULT '[]',
        after_ids TEXT NOT NULL DEFAULT '[]',
        is_first INTEGER NOT NULL DEFAULT 0,
        is_last INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX points_trip ON points (trip_id);
    CREATE TABLE geo_points (
        id INTEGER PRIMARY KEY,
        lon REAL NOT NULL,
        lat REAL NOT NULL,
        cell INTEGER NOT NULL,
        name TEXT,
        address TEXT NOT NULL DEFAULT '{}',
        tags TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX geo_points_cell ON geo_points (cell);
    CREATE TABLE edges (
        id INTEGER PRIMARY KEY,
        source INTEGER NOT NULL,
        target INTEGER NOT NULL,
        costs TEXT NOT NULL
    );
";

/// Error raised when reading the SQLite store.
#[derive(Debug, Error)]
pub enum SqliteTripStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A JSON column could not be decoded.
    #[error("failed to parse {column} for {table} row {id}: {source}")]
    InvalidJson {
        /// Table holding the row.
        table: &'static str,
        /// Column holding the payload.
        column: &'static str,
        /// Row identifier.
        id: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A timestamp column was not RFC 3339.
    #[error("invalid timestamp {value:?} in {table} row {id}: {source}")]
    InvalidTimestamp {
        /// Table holding the row.
        table: &'static str,
        /// Row identifier.
        id: String,
        /// Raw column value.
        value: String,
        /// Parser failure.
        #[source]
        source: chrono::ParseError,
    },
    /// An enumerated column held an unknown value.
    #[error("invalid {column} {value:?} in {table} row {id}")]
    InvalidValue {
        /// Table holding the row.
        table: &'static str,
        /// Offending column.
        column: &'static str,
        /// Row identifier.
        id: String,
        /// Raw column value.
        value: String,
    },
    /// A previous query panicked while holding the connection.
    #[error("SQLite connection is unusable after a panic")]
    Poisoned,
    /// Generic SQLite error when reading rows.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl From<SqliteTripStoreError> for StoreError {
    fn from(error: SqliteTripStoreError) -> Self {
        Self::backend(error)
    }
}

/// Read-only store backed by a SQLite database.
///
/// The connection is guarded by a mutex so one store can serve concurrent
/// planning requests.
pub struct SqliteTripStore {
    connection: Mutex<Connection>,
    grid: GeohashGrid,
}

impl fmt::Debug for SqliteTripStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTripStore")
            .field("grid", &self.grid)
            .finish_non_exhaustive()
    }
}

impl SqliteTripStore {
    /// Open a read-only store whose `geo_points.cell` column was hashed
    /// with `grid`.
    pub fn open<P>(database_path: P, grid: GeohashGrid) -> Result<Self, SqliteTripStoreError>
    where
        P: AsRef<Path>,
    {
        let database_path = database_path.as_ref();
        let connection =
            Connection::open_with_flags(database_path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
                |source| SqliteTripStoreError::OpenDatabase {
                    path: database_path.to_path_buf(),
                    source,
                },
            )?;
        Ok(Self {
            connection: Mutex::new(connection),
            grid,
        })
    }

    /// Grid used for the `cell` column.
    pub const fn grid(&self) -> &GeohashGrid {
        &self.grid
    }

    /// Load every transit vertex, ordered by id.
    pub fn load_geo_points(&self) -> Result<Vec<GeoPoint>, SqliteTripStoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!("{GEO_POINT_SELECT} ORDER BY id"))?;
        let mut rows = statement.query([])?;
        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            points.push(geo_point_from_row(row)?);
        }
        Ok(points)
    }

    /// Load every transit edge, ordered by id.
    pub fn load_edges(&self) -> Result<Vec<GeoEdge>, SqliteTripStoreError> {
        let connection = self.lock()?;
        let mut statement =
            connection.prepare("SELECT id, source, target, costs FROM edges ORDER BY id")?;
        let mut rows = statement.query([])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let source: u64 = row.get(1)?;
            let target: u64 = row.get(2)?;
            let costs_json: String = row.get(3)?;
            let costs: Vec<(TransportMode, Cost)> =
                serde_json::from_str(&costs_json).map_err(|source| {
                    SqliteTripStoreError::InvalidJson {
                        table: "edges",
                        column: "costs",
                        id: id.to_string(),
                        source,
                    }
                })?;
            edges.push(GeoEdge {
                id: EdgeId::new(id),
                from: GeoPointId::new(source),
                to: GeoPointId::new(target),
                costs,
            });
        }
        Ok(edges)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteTripStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteTripStoreError::Poisoned)
    }

    fn load_trip(&self, id: &TripId) -> Result<Option<Trip>, SqliteTripStoreError> {
        let connection = self.lock()?;
        let row = connection
            .query_row(
                "SELECT kind, start, budget, preferred_mode FROM trips WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<u64>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((kind, start, budget, mode)) = row else {
            return Ok(None);
        };
        let kind = match kind.as_str() {
            "anonymous" => TripKind::Anonymous,
            "registered" => TripKind::Registered,
            _ => return Err(invalid_value("trips", "kind", id.as_str(), kind.clone())),
        };
        let preferred_mode = mode
            .parse::<TransportMode>()
            .map_err(|_| invalid_value("trips", "preferred_mode", id.as_str(), mode.clone()))?;
        Ok(Some(Trip {
            id: id.clone(),
            kind,
            start: parse_timestamp("trips", id.as_str(), start)?,
            budget: budget.map(Cost::new),
            preferred_mode,
        }))
    }

    fn load_points(&self, trip: &TripId) -> Result<Vec<Point>, SqliteTripStoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, geo_point_id, duration_secs, deadline, before_ids, after_ids, is_first, is_last
             FROM points WHERE trip_id = ?1 ORDER BY rowid",
        )?;
        let mut rows = statement.query(params![trip.as_str()])?;
        let mut points = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let deadline = row
                .get::<_, Option<String>>(3)?
                .map(|raw| parse_timestamp("points", &id, raw))
                .transpose()?;
            points.push(Point {
                trip_id: trip.clone(),
                geo_point_id: GeoPointId::new(row.get(1)?),
                duration: row.get::<_, Option<u64>>(2)?.map(Duration::from_secs),
                deadline,
                before: parse_json("points", "before_ids", &id, &row.get::<_, String>(4)?)?,
                after: parse_json("points", "after_ids", &id, &row.get::<_, String>(5)?)?,
                first: row.get(6)?,
                last: row.get(7)?,
                id: PointId::from(id),
            });
        }
        Ok(points)
    }

    fn load_geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, SqliteTripStoreError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!("{GEO_POINT_SELECT} WHERE id = ?1"))?;
        let mut rows = statement.query(params![id.get()])?;
        rows.next()?.map(geo_point_from_row).transpose()
    }

    fn load_cells(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, SqliteTripStoreError> {
        let mut raw: Vec<u64> = cells.iter().map(|cell| cell.get()).collect();
        raw.sort_unstable();
        raw.dedup();

        let connection = self.lock()?;
        let mut points = Vec::new();
        for chunk in raw.chunks(SQLITE_MAX_VARIABLE_NUMBER) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let query = format!("{GEO_POINT_SELECT} WHERE cell IN ({placeholders})");
            let mut statement = connection.prepare(&query)?;
            let mut rows = statement.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                points.push(geo_point_from_row(row)?);
            }
        }
        points.sort_unstable_by_key(|point| point.id);
        Ok(points)
    }
}

impl PointRepository for SqliteTripStore {
    fn trip(&self, id: &TripId) -> Result<Option<Trip>, StoreError> {
        Ok(self.load_trip(id)?)
    }

    fn list_points(&self, trip: &TripId) -> Result<Vec<Point>, StoreError> {
        Ok(self.load_points(trip)?)
    }
}

impl GeoPointRepository for SqliteTripStore {
    fn geo_point(&self, id: GeoPointId) -> Result<Option<GeoPoint>, StoreError> {
        Ok(self.load_geo_point(id)?)
    }

    fn geo_points_with_hashes(&self, cells: &[CellId]) -> Result<Vec<GeoPoint>, StoreError> {
        Ok(self.load_cells(cells)?)
    }
}

const GEO_POINT_SELECT: &str =
    "SELECT id, lon, lat, cell, name, address, tags FROM geo_points";

fn geo_point_from_row(row: &Row<'_>) -> Result<GeoPoint, SqliteTripStoreError> {
    let id: u64 = row.get(0)?;
    let key = id.to_string();
    let address: Address = parse_json("geo_points", "address", &key, &row.get::<_, String>(5)?)?;
    let tags: Tags = parse_json("geo_points", "tags", &key, &row.get::<_, String>(6)?)?;
    Ok(GeoPoint {
        id: GeoPointId::new(id),
        location: Coord {
            x: row.get(1)?,
            y: row.get(2)?,
        },
        cell: CellId::new(row.get(3)?),
        name: row.get(4)?,
        address,
        tags,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    table: &'static str,
    column: &'static str,
    id: &str,
    raw: &str,
) -> Result<T, SqliteTripStoreError> {
    serde_json::from_str(raw).map_err(|source| SqliteTripStoreError::InvalidJson {
        table,
        column,
        id: id.to_owned(),
        source,
    })
}

fn parse_timestamp(
    table: &'static str,
    id: &str,
    value: String,
) -> Result<DateTime<Utc>, SqliteTripStoreError> {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(source) => Err(SqliteTripStoreError::InvalidTimestamp {
            table,
            id: id.to_owned(),
            value,
            source,
        }),
    }
}

fn invalid_value(
    table: &'static str,
    column: &'static str,
    id: &str,
    value: String,
) -> SqliteTripStoreError {
    SqliteTripStoreError::InvalidValue {
        table,
        column,
        id: id.to_owned(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SqliteFixture, sample_network};
    use crate::{GeoIndex, ProximitySearch};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_database() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let db_path = dir.path().join("wayfarer.db");
        (dir, db_path)
    }

    #[fixture]
    fn sqlite_store_fixture(
        #[from(temp_database)] (dir, db_path): (TempDir, PathBuf),
    ) -> (TempDir, SqliteTripStore, SqliteFixture) {
        let fixture = sample_network();
        fixture.write(&db_path).expect("persist database");
        let store = SqliteTripStore::open(&db_path, fixture.grid).expect("open store");
        (dir, store, fixture)
    }

    #[rstest]
    fn reads_trip_and_points_in_insertion_order(
        sqlite_store_fixture: (TempDir, SqliteTripStore, SqliteFixture),
    ) {
        let (_dir, store, fixture) = sqlite_store_fixture;
        let trip = store
            .trip(&fixture.trip.id)
            .expect("query trip")
            .expect("trip present");
        assert_eq!(trip, fixture.trip);
        let points = store.list_points(&trip.id).expect("query points");
        assert_eq!(points, fixture.points);
    }

    #[rstest]
    fn missing_trip_is_none(sqlite_store_fixture: (TempDir, SqliteTripStore, SqliteFixture)) {
        let (_dir, store, _fixture) = sqlite_store_fixture;
        assert!(store.trip(&TripId::from("nope")).expect("query").is_none());
        assert!(store.list_points(&TripId::from("nope")).expect("query").is_empty());
    }

    #[rstest]
    fn loads_graph_for_batch_build(
        sqlite_store_fixture: (TempDir, SqliteTripStore, SqliteFixture),
    ) {
        let (_dir, store, fixture) = sqlite_store_fixture;
        assert_eq!(store.load_edges().expect("edges"), fixture.edges);
        assert_eq!(store.load_geo_points().expect("geo points"), fixture.geo_points);
        let first = fixture.geo_points.first().expect("fixture has vertices");
        assert_eq!(
            store.geo_point(first.id).expect("lookup").as_ref(),
            Some(first)
        );
    }

    #[rstest]
    fn proximity_matches_in_memory_index(
        sqlite_store_fixture: (TempDir, SqliteTripStore, SqliteFixture),
    ) {
        let (_dir, store, fixture) = sqlite_store_fixture;
        let index = GeoIndex::from_points(fixture.grid, fixture.geo_points.clone());
        let search = ProximitySearch::new(fixture.grid);
        for point in &fixture.geo_points {
            let from_db = search
                .nearby_points(&store, point, 1_500.0)
                .expect("sqlite query");
            let from_memory = search
                .nearby_points(&index, point, 1_500.0)
                .expect("memory query");
            assert_eq!(from_db, from_memory);
        }
    }

    #[rstest]
    fn chunks_large_cell_lists(sqlite_store_fixture: (TempDir, SqliteTripStore, SqliteFixture)) {
        let (_dir, store, fixture) = sqlite_store_fixture;
        let mut cells: Vec<CellId> = (0..2_500).map(CellId::new).collect();
        cells.extend(fixture.geo_points.iter().map(|point| point.cell));
        let found = store.geo_points_with_hashes(&cells).expect("query");
        assert_eq!(found.len(), fixture.geo_points.len());
    }

    #[rstest]
    fn open_fails_for_missing_database(#[from(temp_database)] (_dir, db_path): (TempDir, PathBuf)) {
        let error = SqliteTripStore::open(&db_path, GeohashGrid::default())
            .expect_err("missing database should fail");
        assert!(matches!(error, SqliteTripStoreError::OpenDatabase { .. }));
    }

    #[rstest]
    #[case::bad_mode(
        "INSERT INTO trips VALUES ('t', 'anonymous', '2024-01-01T00:00:00Z', NULL, 'ferry')",
        "preferred_mode"
    )]
    #[case::bad_kind(
        "INSERT INTO trips VALUES ('t', 'guest', '2024-01-01T00:00:00Z', NULL, 'walk')",
        "kind"
    )]
    fn rejects_unknown_enumerations(
        #[from(temp_database)] (_dir, db_path): (TempDir, PathBuf),
        #[case] insert: &str,
        #[case] expected_column: &str,
    ) {
        let connection = Connection::open(&db_path).expect("create SQLite database");
        connection.execute_batch(SCHEMA).expect("create schema");
        connection.execute(insert, []).expect("insert row");
        drop(connection);

        let store = SqliteTripStore::open(&db_path, GeohashGrid::default()).expect("open store");
        let error = store.load_trip(&TripId::from("t")).unwrap_err();
        assert!(matches!(
            error,
            SqliteTripStoreError::InvalidValue { column, .. } if column == expected_column
        ));
    }

    #[rstest]
    fn rejects_malformed_timestamps(#[from(temp_database)] (_dir, db_path): (TempDir, PathBuf)) {
        let connection = Connection::open(&db_path).expect("create SQLite database");
        connection.execute_batch(SCHEMA).expect("create schema");
        connection
            .execute(
                "INSERT INTO trips VALUES ('t', 'anonymous', 'yesterday', NULL, 'walk')",
                [],
            )
            .expect("insert row");
        drop(connection);

        let store = SqliteTripStore::open(&db_path, GeohashGrid::default()).expect("open store");
        let error = store.trip(&TripId::from("t")).unwrap_err();
        assert!(error.to_string().contains("invalid timestamp"));
    }

    #[rstest]
    fn rejects_invalid_json_columns(#[from(temp_database)] (_dir, db_path): (TempDir, PathBuf)) {
        let connection = Connection::open(&db_path).expect("create SQLite database");
        connection.execute_batch(SCHEMA).expect("create schema");
        connection
            .execute(
                "INSERT INTO edges (id, source, target, costs) VALUES (1, 1, 2, 'not-json')",
                [],
            )
            .expect("insert row");
        drop(connection);

        let store = SqliteTripStore::open(&db_path, GeohashGrid::default()).expect("open store");
        let error = store.load_edges().unwrap_err();
        assert!(matches!(
            error,
            SqliteTripStoreError::InvalidJson { table: "edges", column: "costs", .. }
        ));
    }
}

//! Fixed-length geohash grid used to bucket transit vertices.
//!
//! A grid of `length` bits splits its bits between latitude
//! (`length / 2`) and longitude (the remainder). Cells are uniform in
//! degrees and a cell identifier packs the latitude index in the low bits
//! with the longitude index shifted above it.
//!
//! # Examples
//! ```
//! use geo::Coord;
//! use wayfarer_core::GeohashGrid;
//!
//! let grid = GeohashGrid::default();
//! assert_eq!((grid.lat_bits(), grid.lon_bits()), (20, 21));
//! let cell = grid.encode(Coord { x: 139.767, y: 35.681 });
//! assert_eq!(grid.decode(cell), (grid.row_of(35.681), grid.column_of(139.767)));
//! ```

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use geo::{Coord, Distance, Haversine, Point, Rect};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in metres, matching [`geo::Haversine`].
pub const MEAN_EARTH_RADIUS_METRES: f64 = 6_371_008.8;

/// Metres added to every grid-line comparison so rounding never drops a
/// boundary cell. Extra cells are removed by the exact distance filter.
const BOUNDARY_SLACK_METRES: f64 = 0.01;

/// Identifier of a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct CellId(u64);

impl CellId {
    /// Wrap a raw cell identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw cell identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors returned by [`GeohashGrid::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeohashError {
    /// The bit length is outside the supported range.
    #[error("geohash length {length} is outside {min}..={max}")]
    InvalidLength {
        /// Requested length.
        length: u32,
        /// Smallest supported length.
        min: u32,
        /// Largest supported length.
        max: u32,
    },
}

/// Quantisation of the globe into `2^lat_bits` rows and `2^lon_bits` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeohashGrid {
    lat_bits: u32,
    lon_bits: u32,
}

impl Default for GeohashGrid {
    fn default() -> Self {
        Self {
            lat_bits: Self::DEFAULT_LENGTH / 2,
            lon_bits: Self::DEFAULT_LENGTH - Self::DEFAULT_LENGTH / 2,
        }
    }
}

impl GeohashGrid {
    /// Default bit length; cells are roughly 19 metres square at the equator.
    pub const DEFAULT_LENGTH: u32 = 41;
    /// Smallest supported bit length.
    pub const MIN_LENGTH: u32 = 2;
    /// Largest supported bit length; keeps cell ids within `i64` for storage.
    pub const MAX_LENGTH: u32 = 62;

    /// Build a grid of `length` bits.
    pub const fn new(length: u32) -> Result<Self, GeohashError> {
        if length < Self::MIN_LENGTH || length > Self::MAX_LENGTH {
            return Err(GeohashError::InvalidLength {
                length,
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        let lat_bits = length / 2;
        Ok(Self {
            lat_bits,
            lon_bits: length - lat_bits,
        })
    }

    /// Total bit length.
    pub const fn length(&self) -> u32 {
        self.lat_bits + self.lon_bits
    }

    /// Bits used for the latitude index.
    pub const fn lat_bits(&self) -> u32 {
        self.lat_bits
    }

    /// Bits used for the longitude index.
    pub const fn lon_bits(&self) -> u32 {
        self.lon_bits
    }

    /// Number of latitude rows.
    pub const fn rows(&self) -> u64 {
        1 << self.lat_bits
    }

    /// Number of longitude columns.
    pub const fn columns(&self) -> u64 {
        1 << self.lon_bits
    }

    /// Height of a cell in degrees of latitude.
    pub fn cell_height(&self) -> f64 {
        180.0 / self.rows() as f64
    }

    /// Width of a cell in degrees of longitude.
    pub fn cell_width(&self) -> f64 {
        360.0 / self.columns() as f64
    }

    /// Row containing `lat`. Latitudes outside `[-90, 90]` are clamped.
    pub fn row_of(&self, lat: f64) -> u64 {
        let offset = (lat.clamp(-90.0, 90.0) + 90.0) / self.cell_height();
        (offset.floor() as u64).min(self.rows() - 1)
    }

    /// Column containing `lon`. Longitudes wrap, so `180` shares a column
    /// with `-180`.
    pub fn column_of(&self, lon: f64) -> u64 {
        let offset = normalise_longitude(lon) + 180.0;
        ((offset / self.cell_width()).floor() as u64).min(self.columns() - 1)
    }

    /// Pack a row and column into a cell id.
    pub const fn cell(&self, row: u64, column: u64) -> CellId {
        CellId(row + (column << self.lat_bits))
    }

    /// Cell containing `location` (`x` = longitude, `y` = latitude).
    pub fn encode(&self, location: Coord<f64>) -> CellId {
        self.cell(self.row_of(location.y), self.column_of(location.x))
    }

    /// Split a cell id into its `(row, column)` indices.
    pub const fn decode(&self, cell: CellId) -> (u64, u64) {
        let row = cell.0 & (self.rows() - 1);
        let column = cell.0 >> self.lat_bits;
        (row, column)
    }

    /// Bounds of a cell in degrees.
    pub fn bounds(&self, cell: CellId) -> Rect<f64> {
        let (row, column) = self.decode(cell);
        let south = self.latitude_line(row);
        let west = self.longitude_line(column as f64);
        Rect::new(
            Coord { x: west, y: south },
            Coord {
                x: west + self.cell_width(),
                y: south + self.cell_height(),
            },
        )
    }

    /// Bounding box of cells that may hold points within `radius` metres
    /// of `centre`.
    ///
    /// Each direction is found by binary search over grid lines: distance
    /// from `centre` to a grid line never decreases as the line moves
    /// further away, so the furthest line still inside the radius bounds
    /// the box. The box is a superset of the true disc.
    pub fn search_area(&self, centre: Coord<f64>, radius: f64) -> SearchArea {
        let lat = centre.y.clamp(-90.0, 90.0);
        let lon = normalise_longitude(centre.x);
        let query = Point::new(lon, lat);
        let within = |distance: f64| distance <= radius + BOUNDARY_SLACK_METRES;
        let parallel_distance =
            |line: u64| Haversine.distance(query, Point::new(lon, self.latitude_line(line)));

        let q_row = self.row_of(lat);
        let q_column = self.column_of(lon);

        let south_pole = within(Haversine.distance(query, Point::new(lon, -90.0)));
        let north_pole = within(Haversine.distance(query, Point::new(lon, 90.0)));

        let south_reach = furthest_offset(q_row, |k| within(parallel_distance(q_row - k + 1)));
        let north_reach = furthest_offset(self.rows() - 1 - q_row, |k| {
            within(parallel_distance(q_row + k))
        });
        let south = if south_pole { 0 } else { q_row - south_reach };
        let north = if north_pole {
            self.rows() - 1
        } else {
            q_row + north_reach
        };

        let columns = self.columns();
        if south_pole || north_pole {
            return SearchArea {
                grid: *self,
                south,
                north,
                first_column: 0,
                column_count: columns,
            };
        }

        let q_col = q_column as f64;
        let west_reach = furthest_offset(columns - 1, |k| {
            let line = self.longitude_line(q_col - k as f64 + 1.0);
            within(meridian_distance(lat, lon - line))
        });
        let east_reach = furthest_offset(columns - 1, |k| {
            let line = self.longitude_line(q_col + k as f64);
            within(meridian_distance(lat, line - lon))
        });

        let (first_column, column_count) = if west_reach + east_reach + 1 >= columns {
            (0, columns)
        } else {
            (
                (q_column + columns - west_reach) % columns,
                west_reach + east_reach + 1,
            )
        };

        SearchArea {
            grid: *self,
            south,
            north,
            first_column,
            column_count,
        }
    }

    fn latitude_line(&self, line: u64) -> f64 {
        -90.0 + line as f64 * self.cell_height()
    }

    fn longitude_line(&self, line: f64) -> f64 {
        -180.0 + line * self.cell_width()
    }
}

/// Rectangular block of grid cells, possibly wrapping the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchArea {
    grid: GeohashGrid,
    south: u64,
    north: u64,
    first_column: u64,
    column_count: u64,
}

impl SearchArea {
    /// Southernmost and northernmost rows, inclusive.
    pub const fn rows(&self) -> (u64, u64) {
        (self.south, self.north)
    }

    /// Column indices covered, west to east.
    pub fn columns(&self) -> impl Iterator<Item = u64> + '_ {
        let total = self.grid.columns();
        (0..self.column_count).map(move |offset| (self.first_column + offset) % total)
    }

    /// Number of cells in the area.
    pub const fn cell_count(&self) -> u64 {
        (self.north - self.south + 1).saturating_mul(self.column_count)
    }

    /// Every cell id in the area, column by column.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.columns().flat_map(move |column| {
            (self.south..=self.north).map(move |row| self.grid.cell(row, column))
        })
    }
}

/// Largest `k` in `1..=limit` for which `within(k)` holds, or zero.
///
/// `within` must be true for a prefix of the range and false afterwards.
fn furthest_offset(limit: u64, within: impl Fn(u64) -> bool) -> u64 {
    if limit == 0 || !within(1) {
        return 0;
    }
    let (mut low, mut high) = (1, limit);
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if within(mid) {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

/// Shortest distance in metres from a point at `lat` to the half meridian
/// `delta_lon` degrees away.
///
/// Beyond a quarter turn the nearest point of the meridian is the pole.
fn meridian_distance(lat: f64, delta_lon: f64) -> f64 {
    let phi = lat.to_radians();
    let delta = delta_lon.clamp(0.0, 180.0).to_radians();
    let angle = if delta >= FRAC_PI_2 {
        FRAC_PI_2 - phi.abs()
    } else {
        (phi.cos() * delta.sin()).clamp(-1.0, 1.0).asin()
    };
    MEAN_EARTH_RADIUS_METRES * angle
}

fn normalise_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

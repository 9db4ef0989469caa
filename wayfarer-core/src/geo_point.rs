//! Transit graph vertices with their location and descriptive metadata.

use std::collections::BTreeMap;

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CellId, GeoPointId, GeohashGrid};

/// Free-form key/value tags attached to a geo point.
pub type Tags = BTreeMap<String, String>;

/// Postal address of a geo point. Every component is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address {
    /// Prefecture or state.
    #[cfg_attr(feature = "serde", serde(default))]
    pub prefecture: Option<String>,
    /// City or town.
    #[cfg_attr(feature = "serde", serde(default))]
    pub city: Option<String>,
    /// District within the city.
    #[cfg_attr(feature = "serde", serde(default))]
    pub district: Option<String>,
    /// Land or street number.
    #[cfg_attr(feature = "serde", serde(default))]
    pub land_number: Option<String>,
}

/// A location in the transit graph.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayfarer_core::{GeoPoint, GeoPointId, GeohashGrid};
///
/// let station = GeoPoint::new(GeoPointId::new(3), Coord { x: 139.7671, y: 35.6812 })
///     .with_name("Tokyo")
///     .with_tag("railway", "station");
/// assert_eq!(station.cell, GeohashGrid::default().encode(station.location));
/// assert_eq!(station.tags.get("railway").map(String::as_str), Some("station"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Unique identifier.
    pub id: GeoPointId,
    /// Position in WGS84 (`x` = longitude, `y` = latitude).
    pub location: Coord<f64>,
    /// Grid cell containing `location`.
    pub cell: CellId,
    /// Display name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    /// Postal address.
    #[cfg_attr(feature = "serde", serde(default))]
    pub address: Address,
    /// Free-form tags.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Tags,
}

impl GeoPoint {
    /// Create a geo point hashed with the default grid.
    pub fn new(id: GeoPointId, location: Coord<f64>) -> Self {
        Self {
            id,
            location,
            cell: GeohashGrid::default().encode(location),
            name: None,
            address: Address::default(),
            tags: Tags::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the postal address.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Recompute `cell` for another grid.
    pub fn rehash(&mut self, grid: &GeohashGrid) {
        self.cell = grid.encode(self.location);
    }

    /// Position as a `geo::Point`.
    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::from(self.location)
    }
}

//! Routes through the transit graph.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Cost, EdgeId, GeoPointId};

/// A fully unpacked path between two transit vertices.
///
/// `vertices` lists every vertex from source to destination and `edges`
/// the original edges joining consecutive vertices, so
/// `edges.len() + 1 == vertices.len()` for any non-empty path.
///
/// # Examples
/// ```
/// use wayfarer_core::{Cost, EdgeId, GeoPointId, RoutePath};
///
/// let path = RoutePath::new(
///     Cost::new(7),
///     vec![GeoPointId::new(1), GeoPointId::new(2)],
///     vec![EdgeId::new(10)],
/// );
/// assert_eq!(path.source(), Some(GeoPointId::new(1)));
/// assert_eq!(path.destination(), Some(GeoPointId::new(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoutePath {
    /// Total cost of the path.
    pub cost: Cost,
    /// Vertices visited, in order.
    pub vertices: Vec<GeoPointId>,
    /// Original edges traversed, in order.
    pub edges: Vec<EdgeId>,
}

impl RoutePath {
    /// Create a path from its parts.
    pub const fn new(cost: Cost, vertices: Vec<GeoPointId>, edges: Vec<EdgeId>) -> Self {
        Self {
            cost,
            vertices,
            edges,
        }
    }

    /// Zero-cost path that stays at `vertex`.
    pub fn stationary(vertex: GeoPointId) -> Self {
        Self::new(Cost::ZERO, vec![vertex], Vec::new())
    }

    /// First vertex.
    pub fn source(&self) -> Option<GeoPointId> {
        self.vertices.first().copied()
    }

    /// Last vertex.
    pub fn destination(&self) -> Option<GeoPointId> {
        self.vertices.last().copied()
    }
}

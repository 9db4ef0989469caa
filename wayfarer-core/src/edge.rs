//! Transit graph edges and the transport modes that price them.
//!
//! # Examples
//! ```
//! use wayfarer_core::{Cost, EdgeId, GeoEdge, GeoPointId, TransportMode};
//!
//! let edge = GeoEdge::new(EdgeId::new(1), GeoPointId::new(1), GeoPointId::new(2))
//!     .with_cost(TransportMode::Walk, Cost::new(12));
//! assert_eq!(edge.cost_for(TransportMode::Walk), Some(Cost::new(12)));
//! assert_eq!(edge.cost_for(TransportMode::Train), None);
//! assert_eq!(TransportMode::Bus.to_string(), "bus");
//! ```

use std::fmt;
use std::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{EdgeId, GeoPointId};

/// Ways of travelling along a transit edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TransportMode {
    /// On foot.
    Walk,
    /// Scheduled bus services.
    Bus,
    /// Rail services.
    Train,
}

impl TransportMode {
    /// Every supported mode in declaration order.
    pub const ALL: [Self; 3] = [Self::Walk, Self::Bus, Self::Train];

    /// Return the mode as a lowercase `&str`.
    ///
    /// # Examples
    /// ```
    /// use wayfarer_core::TransportMode;
    ///
    /// assert_eq!(TransportMode::Train.as_str(), "train");
    /// ```
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Bus => "bus",
            Self::Train => "train",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walk" => Ok(Self::Walk),
            "bus" => Ok(Self::Bus),
            "train" => Ok(Self::Train),
            _ => Err(format!("unknown transport mode '{s}'")),
        }
    }
}

/// Non-negative travel cost in the trip's budget unit.
///
/// Costs are integral so equal-length routes compare exactly. Addition
/// saturates at `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Cost(u64);

impl Cost {
    /// The zero cost.
    pub const ZERO: Self = Self(0);
    /// The largest representable cost.
    pub const MAX: Self = Self(u64::MAX);

    /// Wrap a raw amount.
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Return the raw amount.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directed edge between two transit vertices.
///
/// An edge may be usable by several modes, each at its own cost.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoEdge {
    /// Unique identifier.
    pub id: EdgeId,
    /// Tail vertex.
    pub from: GeoPointId,
    /// Head vertex.
    pub to: GeoPointId,
    /// Cost of traversing the edge per transport mode.
    pub costs: Vec<(TransportMode, Cost)>,
}

impl GeoEdge {
    /// Create an edge with no mode costs.
    pub const fn new(id: EdgeId, from: GeoPointId, to: GeoPointId) -> Self {
        Self {
            id,
            from,
            to,
            costs: Vec::new(),
        }
    }

    /// Add or replace the cost for `mode`.
    #[must_use]
    pub fn with_cost(mut self, mode: TransportMode, cost: Cost) -> Self {
        self.costs.retain(|(existing, _)| *existing != mode);
        self.costs.push((mode, cost));
        self
    }

    /// Return the cost for `mode`, if the edge supports it.
    ///
    /// When the same mode is listed more than once the cheapest entry wins.
    pub fn cost_for(&self, mode: TransportMode) -> Option<Cost> {
        self.costs
            .iter()
            .filter(|(candidate, _)| *candidate == mode)
            .map(|(_, cost)| *cost)
            .min()
    }
}

//! Trip points and their ordering constraints.

use std::time::Duration;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{GeoPointId, PointId, TripId};

/// A stop on a trip together with its ordering and timing constraints.
///
/// `before` lists points this point must precede; `after` lists points it
/// must follow. At most one point per trip may be `first` and at most one may
/// be `last`.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use wayfarer_core::{GeoPointId, Point, PointId, TripId};
///
/// let point = Point::new("museum", TripId::from("t"), GeoPointId::new(4))
///     .with_duration(Duration::from_secs(3_600))
///     .must_precede(["cafe"]);
/// assert_eq!(point.before, vec![PointId::from("cafe")]);
/// assert!(!point.first);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// Unique identifier within the trip.
    pub id: PointId,
    /// Owning trip.
    pub trip_id: TripId,
    /// Transit graph location of the stop.
    pub geo_point_id: GeoPointId,
    /// Time spent at the stop.
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration: Option<Duration>,
    /// Latest acceptable arrival time.
    #[cfg_attr(feature = "serde", serde(default))]
    pub deadline: Option<DateTime<Utc>>,
    /// Points that must be visited after this one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub before: Vec<PointId>,
    /// Points that must be visited before this one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub after: Vec<PointId>,
    /// Whether the trip starts here.
    #[cfg_attr(feature = "serde", serde(default))]
    pub first: bool,
    /// Whether the trip ends here.
    #[cfg_attr(feature = "serde", serde(default))]
    pub last: bool,
}

impl Point {
    /// Create an unconstrained point.
    pub fn new(id: impl Into<PointId>, trip_id: TripId, geo_point_id: GeoPointId) -> Self {
        Self {
            id: id.into(),
            trip_id,
            geo_point_id,
            duration: None,
            deadline: None,
            before: Vec::new(),
            after: Vec::new(),
            first: false,
            last: false,
        }
    }

    /// Set the dwell time at this point.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the arrival deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Require this point to be visited before each of `targets`.
    #[must_use]
    pub fn must_precede<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PointId>,
    {
        self.before.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Require this point to be visited after each of `sources`.
    #[must_use]
    pub fn must_follow<I, T>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PointId>,
    {
        self.after.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Mark the point as the start of the trip.
    #[must_use]
    pub const fn as_first(mut self) -> Self {
        self.first = true;
        self
    }

    /// Mark the point as the end of the trip.
    #[must_use]
    pub const fn as_last(mut self) -> Self {
        self.last = true;
        self
    }
}

/// One complete visiting order of a trip's points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PointOrder(Vec<PointId>);

impl PointOrder {
    /// Wrap an ordered list of point identifiers.
    pub const fn new(points: Vec<PointId>) -> Self {
        Self(points)
    }

    /// Borrow the ordered identifiers.
    pub fn points(&self) -> &[PointId] {
        &self.0
    }

    /// Number of points in the order.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the order is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `id` within the order.
    pub fn position(&self, id: &PointId) -> Option<usize> {
        self.0.iter().position(|candidate| candidate == id)
    }

    /// Iterate over consecutive `(from, to)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&PointId, &PointId)> {
        self.0.windows(2).filter_map(|pair| match pair {
            [from, to] => Some((from, to)),
            _ => None,
        })
    }
}

impl From<Vec<PointId>> for PointOrder {
    fn from(points: Vec<PointId>) -> Self {
        Self(points)
    }
}

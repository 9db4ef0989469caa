//! Trip plans and the planner interface.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    CancellationFlag, Cancelled, Cost, GeoPointId, NearbyError, PointId, PointOrder, RoutePath,
    StoreError, StructuralError, TripId,
};

/// Outcome of routing one candidate order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "status", rename_all = "snake_case")
)]
pub enum PlanStatus {
    /// Every leg has a route and the total fits the budget.
    Feasible,
    /// Every leg has a route but the total exceeds the budget.
    OverBudget,
    /// No route connects the named consecutive points.
    NoRoute {
        /// Point the leg starts from.
        from: PointId,
        /// Point the leg ends at.
        to: PointId,
    },
}

/// Route between two consecutive points of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Leg {
    /// Point the leg starts from.
    pub from: PointId,
    /// Point the leg ends at.
    pub to: PointId,
    /// Cost of the leg.
    pub cost: Cost,
    /// Equally cheap routes for the leg; never empty.
    pub routes: Vec<RoutePath>,
}

/// A candidate order with its routed legs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripPlan {
    /// Visiting order.
    pub order: PointOrder,
    /// Routed legs, one per consecutive pair up to the first unroutable pair.
    pub legs: Vec<Leg>,
    /// Sum of leg costs.
    pub total_cost: Cost,
    /// Whether the plan can be followed within budget.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub status: PlanStatus,
}

impl TripPlan {
    /// Whether every leg is routed and the total fits the budget.
    pub const fn is_feasible(&self) -> bool {
        matches!(self.status, PlanStatus::Feasible)
    }
}

/// Errors returned by [`TripPlanner::plan_trip`].
#[derive(Debug, Error)]
pub enum PlanError {
    /// The trip does not exist.
    #[error("trip {trip} was not found")]
    TripNotFound {
        /// Requested trip.
        trip: TripId,
    },
    /// A point references a transit vertex that does not exist.
    #[error("point {point} references unknown geo point {geo_point}")]
    GeoPointNotFound {
        /// Offending point.
        point: PointId,
        /// Missing vertex.
        geo_point: GeoPointId,
    },
    /// The trip's constraints cannot be ordered.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// A repository failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Looking up route entry points failed.
    #[error("failed to find route entry points: {0}")]
    Nearby(#[from] NearbyError),
    /// The routing backend failed for a reason other than cancellation.
    #[error("route query failed: {source}")]
    Route {
        /// Backend-specific failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The caller cancelled the request.
    #[error("planning cancelled")]
    Cancelled(#[from] Cancelled),
}

/// Produce routed plans for a trip's candidate visiting orders.
///
/// Planners must be `Send + Sync` so concurrent requests can share one
/// instance. Implementations return feasible plans first.
pub trait TripPlanner: Send + Sync {
    /// Plan up to `max_candidates` orders of `trip`.
    fn plan_trip(
        &self,
        trip: &TripId,
        max_candidates: usize,
        cancel: &CancellationFlag,
    ) -> Result<Vec<TripPlan>, PlanError>;
}

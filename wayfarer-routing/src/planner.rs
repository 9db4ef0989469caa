//! Trip plan assembly over the published route index.
//!
//! Supports any store that can list a trip's points and resolve their geo
//! points; routing always goes through the [`RouteIndexHandle`] snapshot
//! taken at the start of the request.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use wayfarer_core::{
    CancellationFlag, ConstraintGraph, Cost, GeoPointId, GeoPointRepository, Leg, PlanError,
    PlanStatus, Point, PointId, PointOrder, PointRepository, Trip, TripId, TripPlan, TripPlanner,
    enumerate_orders,
};

use crate::index::{RouteIndex, RouteIndexHandle};
use crate::query::QueryError;

/// Configuration for [`ContractionPlanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Radius in metres searched for route entry points around each stop.
    pub radius: f64,
    /// Upper bound on entry points kept per stop, nearest first.
    pub max_entry_points: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            radius: 2_000.0,
            max_entry_points: 3,
        }
    }
}

/// Planner that routes candidate orders over contracted graphs.
///
/// The planner is generic over a read-only store supplying trips, points
/// and the geo points they stand at.
#[derive(Debug)]
pub struct ContractionPlanner<S> {
    store: S,
    index: Arc<RouteIndexHandle>,
    config: PlannerConfig,
}

impl<S> ContractionPlanner<S>
where
    S: PointRepository + GeoPointRepository,
{
    /// Construct a planner using default configuration.
    #[must_use]
    pub fn new(store: S, index: Arc<RouteIndexHandle>) -> Self {
        Self::with_config(store, index, PlannerConfig::default())
    }

    /// Construct a planner with explicit configuration.
    #[must_use]
    pub const fn with_config(store: S, index: Arc<RouteIndexHandle>, config: PlannerConfig) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

impl<S> TripPlanner for ContractionPlanner<S>
where
    S: PointRepository + GeoPointRepository + Send + Sync,
{
    fn plan_trip(
        &self,
        trip: &TripId,
        max_candidates: usize,
        cancel: &CancellationFlag,
    ) -> Result<Vec<TripPlan>, PlanError> {
        cancel.check()?;
        let trip = self
            .store
            .trip(trip)?
            .ok_or_else(|| PlanError::TripNotFound { trip: trip.clone() })?;
        let graph = ConstraintGraph::build(self.store.list_points(&trip.id)?)?;
        let orders = enumerate_orders(&graph, trip.start, max_candidates, cancel)?;

        let index = self.index.current();
        let mut request = Request {
            store: &self.store,
            config: &self.config,
            index: &index,
            trip: &trip,
            cancel,
            points: graph.points().iter().map(|point| (&point.id, point)).collect(),
            entries: HashMap::new(),
            legs: HashMap::new(),
        };
        let mut plans = orders
            .into_iter()
            .map(|order| request.assemble(order))
            .collect::<Result<Vec<_>, _>>()?;
        plans.sort_by_key(rank);
        debug!(
            "planned {} candidates for trip {} against route index version {}",
            plans.len(),
            trip.id,
            index.version()
        );
        Ok(plans)
    }
}

/// Sort key: feasible plans, then over-budget plans, each by cost, then
/// unroutable plans. The sort is stable so ties keep enumeration order.
fn rank(plan: &TripPlan) -> (u8, Cost) {
    match plan.status {
        PlanStatus::Feasible => (0, plan.total_cost),
        PlanStatus::OverBudget => (1, plan.total_cost),
        PlanStatus::NoRoute { .. } => (2, Cost::ZERO),
    }
}

/// Per-request state; caches are shared by every candidate order.
struct Request<'a, S> {
    store: &'a S,
    config: &'a PlannerConfig,
    index: &'a RouteIndex,
    trip: &'a Trip,
    cancel: &'a CancellationFlag,
    points: HashMap<&'a PointId, &'a Point>,
    entries: HashMap<PointId, Vec<GeoPointId>>,
    legs: HashMap<(PointId, PointId), Option<Leg>>,
}

impl<S> Request<'_, S>
where
    S: GeoPointRepository,
{
    fn assemble(&mut self, order: PointOrder) -> Result<TripPlan, PlanError> {
        let mut legs = Vec::with_capacity(order.len().saturating_sub(1));
        let mut total = Cost::ZERO;
        let mut blocked = None;
        for (from, to) in order.pairs() {
            match self.leg(from, to)? {
                Some(leg) => {
                    total = total + leg.cost;
                    legs.push(leg);
                }
                None => {
                    blocked = Some(PlanStatus::NoRoute {
                        from: from.clone(),
                        to: to.clone(),
                    });
                    break;
                }
            }
        }
        let status = blocked.unwrap_or_else(|| {
            if self.trip.within_budget(total) {
                PlanStatus::Feasible
            } else {
                PlanStatus::OverBudget
            }
        });
        Ok(TripPlan {
            order,
            legs,
            total_cost: total,
            status,
        })
    }

    /// Cheapest entry combination between two stops, with all its tied
    /// routes. `None` when no combination connects.
    fn leg(&mut self, from: &PointId, to: &PointId) -> Result<Option<Leg>, PlanError> {
        let key = (from.clone(), to.clone());
        if let Some(cached) = self.legs.get(&key) {
            return Ok(cached.clone());
        }
        let sources = self.entries(from)?;
        let targets = self.entries(to)?;
        let mode = self.trip.preferred_mode;

        let mut best: Option<Leg> = None;
        for &source in &sources {
            for &target in &targets {
                let routes = self
                    .index
                    .shortest_path(source, target, mode, self.cancel)
                    .map_err(route_error)?;
                let Some(cost) = routes.first().map(|route| route.cost) else {
                    continue;
                };
                if best.as_ref().is_none_or(|leg| cost < leg.cost) {
                    best = Some(Leg {
                        from: from.clone(),
                        to: to.clone(),
                        cost,
                        routes,
                    });
                }
            }
        }
        if best.is_none() {
            warn!("no {mode} route from {from} to {to}");
        }
        self.legs.insert(key, best.clone());
        Ok(best)
    }

    /// Route graph vertices near the stop, nearest first.
    fn entries(&mut self, id: &PointId) -> Result<Vec<GeoPointId>, PlanError> {
        if let Some(cached) = self.entries.get(id) {
            return Ok(cached.clone());
        }
        let Some(point) = self.points.get(id) else {
            return Ok(Vec::new());
        };
        let geo_point = self
            .store
            .geo_point(point.geo_point_id)?
            .ok_or_else(|| PlanError::GeoPointNotFound {
                point: point.id.clone(),
                geo_point: point.geo_point_id,
            })?;
        let entries: Vec<GeoPointId> = self
            .index
            .nearby_points(&geo_point, self.config.radius)?
            .into_iter()
            .take(self.config.max_entry_points)
            .map(|vertex| vertex.id)
            .collect();
        if entries.is_empty() {
            warn!(
                "no route entry point within {} m of {id}",
                self.config.radius
            );
        }
        self.entries.insert(id.clone(), entries.clone());
        Ok(entries)
    }
}

fn route_error(error: QueryError) -> PlanError {
    match error {
        QueryError::Cancelled(cancelled) => PlanError::Cancelled(cancelled),
        other @ QueryError::UnresolvedArc { .. } => PlanError::Route {
            source: Box::new(other),
        },
    }
}

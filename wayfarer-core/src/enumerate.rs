//! Backtracking enumeration of feasible visiting orders.
//!
//! The search keeps a ready set of points whose predecessors have all been
//! visited. At each step it orders the ready set by arrival deadline, prunes
//! the branch when the most urgent ready point can no longer be reached in
//! time, then tries each ready point in turn. All state changes made for a
//! branch are undone before the next branch is tried.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

use crate::{CancellationFlag, Cancelled, ConstraintGraph, PointOrder};

/// Enumerate up to `limit` visiting orders of `graph`.
///
/// `start` seeds the simulated clock, which advances by each visited
/// point's duration. Orders are produced in a deterministic sequence:
/// ready points with a deadline are tried before those without, earliest
/// deadline first, with ties kept in discovery order. A point may be
/// reached exactly at its deadline.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use wayfarer_core::{CancellationFlag, ConstraintGraph, GeoPointId, Point, TripId, enumerate_orders};
///
/// let trip = TripId::from("t");
/// let graph = ConstraintGraph::build(vec![
///     Point::new("a", trip.clone(), GeoPointId::new(1)).as_first(),
///     Point::new("b", trip.clone(), GeoPointId::new(2)).must_precede(["c"]),
///     Point::new("c", trip, GeoPointId::new(3)).as_last(),
/// ])?;
/// let orders = enumerate_orders(&graph, Utc::now(), 10, &CancellationFlag::new())?;
/// assert_eq!(orders.len(), 1);
/// let ids: Vec<_> = orders[0].points().iter().map(|id| id.as_str()).collect();
/// assert_eq!(ids, ["a", "b", "c"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn enumerate_orders(
    graph: &ConstraintGraph,
    start: DateTime<Utc>,
    limit: usize,
    cancel: &CancellationFlag,
) -> Result<Vec<PointOrder>, Cancelled> {
    if limit == 0 || graph.is_empty() {
        return Ok(Vec::new());
    }
    let mut search = Search::new(graph, limit, cancel);
    search.explore(start)?;
    debug!(
        "enumerated {} candidate orders over {} points",
        search.results.len(),
        graph.len()
    );
    Ok(search.results)
}

struct Search<'g> {
    graph: &'g ConstraintGraph,
    cancel: &'g CancellationFlag,
    limit: usize,
    in_degree: Vec<usize>,
    ready: Vec<usize>,
    order: Vec<usize>,
    results: Vec<PointOrder>,
}

/// Everything needed to undo one visit.
struct Undo {
    node: usize,
    ready_position: usize,
    released: usize,
}

impl<'g> Search<'g> {
    fn new(graph: &'g ConstraintGraph, limit: usize, cancel: &'g CancellationFlag) -> Self {
        let in_degree = graph.in_degrees().to_vec();
        let ready = (0..graph.len())
            .filter(|&node| in_degree.get(node) == Some(&0))
            .collect();
        Self {
            graph,
            cancel,
            limit,
            in_degree,
            ready,
            order: Vec::with_capacity(graph.len()),
            results: Vec::new(),
        }
    }

    fn explore(&mut self, clock: DateTime<Utc>) -> Result<(), Cancelled> {
        self.cancel.check()?;
        if self.results.len() >= self.limit {
            return Ok(());
        }
        if self.ready.is_empty() {
            if self.order.len() == self.graph.len() {
                self.record();
            }
            return Ok(());
        }

        let candidates = self.sorted_ready();
        if let Some(&head) = candidates.first()
            && self.deadline(head).is_some_and(|deadline| clock > deadline)
        {
            return Ok(());
        }

        for node in candidates {
            let undo = self.visit(node);
            let next_clock = advance(clock, self.duration(node));
            let outcome = self.explore(next_clock);
            self.unvisit(undo);
            outcome?;
            if self.results.len() >= self.limit {
                break;
            }
        }
        Ok(())
    }

    /// Snapshot of the ready set, deadline-bearing points first by ascending
    /// deadline. The sort is stable so equal keys keep discovery order.
    fn sorted_ready(&self) -> Vec<usize> {
        let mut candidates = self.ready.clone();
        candidates.sort_by_key(|&node| {
            let deadline = self.deadline(node);
            (deadline.is_none(), deadline)
        });
        candidates
    }

    fn visit(&mut self, node: usize) -> Undo {
        let ready_position = self
            .ready
            .iter()
            .position(|&candidate| candidate == node)
            .unwrap_or(self.ready.len());
        if ready_position < self.ready.len() {
            self.ready.remove(ready_position);
        }
        self.order.push(node);

        let mut released = 0;
        for &next in self.graph.successors(node) {
            if let Some(degree) = self.in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    self.ready.push(next);
                    released += 1;
                }
            }
        }
        Undo {
            node,
            ready_position,
            released,
        }
    }

    fn unvisit(&mut self, undo: Undo) {
        self.ready.truncate(self.ready.len() - undo.released);
        for &next in self.graph.successors(undo.node) {
            if let Some(degree) = self.in_degree.get_mut(next) {
                *degree += 1;
            }
        }
        self.order.pop();
        self.ready.insert(undo.ready_position, undo.node);
    }

    fn record(&mut self) {
        let ids = self
            .order
            .iter()
            .filter_map(|&node| self.graph.point(node).map(|p| p.id.clone()))
            .collect();
        self.results.push(PointOrder::new(ids));
    }

    fn deadline(&self, node: usize) -> Option<DateTime<Utc>> {
        self.graph.point(node).and_then(|p| p.deadline)
    }

    fn duration(&self, node: usize) -> Option<Duration> {
        self.graph.point(node).and_then(|p| p.duration)
    }
}

/// Advance `clock` by `duration`, saturating at the latest representable
/// instant.
fn advance(clock: DateTime<Utc>, duration: Option<Duration>) -> DateTime<Utc> {
    let Some(duration) = duration else {
        return clock;
    };
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| clock.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

//! Bidirectional upward Dijkstra over a contracted graph.
//!
//! The forward search climbs from the source along
//! [`UpwardGraph::edges_to_higher_importance`]; the backward search climbs
//! from the destination along
//! [`UpwardGraph::edges_from_higher_importance`]. The two alternate one pop
//! at a time. Every vertex settled by both sides is a meeting candidate and
//! all candidates achieving the minimum combined distance are kept, so
//! equally short routes through different peaks are all reported.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::debug;
use thiserror::Error;
use wayfarer_core::{CancellationFlag, Cancelled, Cost, GeoPointId, RoutePath};

use crate::graph::{ArcId, ArcKind, EdgeResolver, UpwardArc, UpwardGraph};

/// Errors returned by [`shortest_paths`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A search step referenced an arc the graph cannot resolve.
    #[error("arc {arc} could not be resolved while unpacking a route")]
    UnresolvedArc {
        /// The offending arc.
        arc: ArcId,
    },
    /// The caller cancelled the query.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// All equally short routes from `source` to `target`.
///
/// Returns an empty list when either vertex is unknown or no route exists,
/// and the single stationary route when `source == target`.
///
/// # Errors
///
/// [`QueryError::Cancelled`] when `cancel` is raised (polled once per
/// queue pop) and [`QueryError::UnresolvedArc`] when shortcut unpacking
/// meets an arc the graph does not know.
pub fn shortest_paths<G>(
    graph: &G,
    source: GeoPointId,
    target: GeoPointId,
    cancel: &CancellationFlag,
) -> Result<Vec<RoutePath>, QueryError>
where
    G: UpwardGraph + EdgeResolver + ?Sized,
{
    if !graph.contains(source) || !graph.contains(target) {
        return Ok(Vec::new());
    }
    if source == target {
        return Ok(vec![RoutePath::stationary(source)]);
    }

    let mut forward = Side::new(source);
    let mut backward = Side::new(target);
    let mut best: Option<Cost> = None;
    let mut meetings: Vec<GeoPointId> = Vec::new();
    let mut step: usize = 0;

    loop {
        let forward_open = forward.open(best);
        let backward_open = backward.open(best);
        let use_forward = match (forward_open, backward_open) {
            (false, false) => break,
            (true, false) => true,
            (false, true) => false,
            (true, true) => step % 2 == 0,
        };
        step += 1;
        cancel.check()?;

        let (side, other) = if use_forward {
            (&mut forward, &backward)
        } else {
            (&mut backward, &forward)
        };
        let Some((distance, vertex)) = side.pop() else {
            continue;
        };
        if let Some(&across) = other.settled_distance(vertex) {
            let total = distance + across;
            match best {
                Some(current) if total > current => {}
                Some(current) if total == current => meetings.push(vertex),
                _ => {
                    best = Some(total);
                    meetings.clear();
                    meetings.push(vertex);
                }
            }
        }
        let arcs = if use_forward {
            graph.edges_to_higher_importance(vertex)
        } else {
            graph.edges_from_higher_importance(vertex)
        };
        side.relax(vertex, distance, arcs);
    }

    debug!(
        "route query {source} -> {target}: settled {} forward, {} backward, {} meeting vertices",
        forward.settled.len(),
        backward.settled.len(),
        meetings.len()
    );
    let Some(cost) = best else {
        return Ok(Vec::new());
    };

    let mut paths: Vec<RoutePath> = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        let path = unpack(graph, &forward, &backward, source, meeting, cost)?;
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// State of one search direction.
struct Side {
    queue: BinaryHeap<Reverse<(Cost, GeoPointId)>>,
    distance: HashMap<GeoPointId, Cost>,
    parent: HashMap<GeoPointId, (GeoPointId, ArcId)>,
    settled: HashSet<GeoPointId>,
}

impl Side {
    fn new(origin: GeoPointId) -> Self {
        Self {
            queue: BinaryHeap::from([Reverse((Cost::ZERO, origin))]),
            distance: HashMap::from([(origin, Cost::ZERO)]),
            parent: HashMap::new(),
            settled: HashSet::new(),
        }
    }

    /// Whether the side may still improve on or tie `best`.
    fn open(&self, best: Option<Cost>) -> bool {
        self.queue
            .peek()
            .is_some_and(|Reverse((next, _))| best.is_none_or(|bound| *next <= bound))
    }

    /// Pop the next unsettled vertex, skipping stale entries.
    fn pop(&mut self) -> Option<(Cost, GeoPointId)> {
        while let Some(Reverse((distance, vertex))) = self.queue.pop() {
            if self.settled.contains(&vertex)
                || self.distance.get(&vertex).is_some_and(|&known| distance > known)
            {
                continue;
            }
            self.settled.insert(vertex);
            return Some((distance, vertex));
        }
        None
    }

    fn settled_distance(&self, vertex: GeoPointId) -> Option<&Cost> {
        if self.settled.contains(&vertex) {
            self.distance.get(&vertex)
        } else {
            None
        }
    }

    fn relax(&mut self, vertex: GeoPointId, distance: Cost, arcs: &[UpwardArc]) {
        for arc in arcs {
            let candidate = distance + arc.cost;
            if self
                .distance
                .get(&arc.neighbour)
                .is_none_or(|&known| candidate < known)
            {
                self.distance.insert(arc.neighbour, candidate);
                self.parent.insert(arc.neighbour, (vertex, arc.arc));
                self.queue.push(Reverse((candidate, arc.neighbour)));
            }
        }
    }
}

/// Expand the route through `meeting` into original edges.
fn unpack<G>(
    graph: &G,
    forward: &Side,
    backward: &Side,
    source: GeoPointId,
    meeting: GeoPointId,
    cost: Cost,
) -> Result<RoutePath, QueryError>
where
    G: EdgeResolver + ?Sized,
{
    // Arcs from the source up to the meeting vertex, then down to the target.
    let mut chain: Vec<ArcId> = Vec::new();
    let mut cursor = meeting;
    while let Some(&(previous, arc)) = forward.parent.get(&cursor) {
        chain.push(arc);
        cursor = previous;
    }
    chain.reverse();
    cursor = meeting;
    while let Some(&(next, arc)) = backward.parent.get(&cursor) {
        chain.push(arc);
        cursor = next;
    }

    let mut vertices = vec![source];
    let mut edges = Vec::with_capacity(chain.len());
    let mut stack: Vec<ArcId> = chain.into_iter().rev().collect();
    while let Some(arc) = stack.pop() {
        let stored = graph
            .resolve_edge(arc)
            .ok_or(QueryError::UnresolvedArc { arc })?;
        match stored.kind {
            ArcKind::Original(edge) => {
                edges.push(edge);
                vertices.push(stored.to);
            }
            ArcKind::Shortcut { first, second } => {
                stack.push(second);
                stack.push(first);
            }
        }
    }
    Ok(RoutePath::new(cost, vertices, edges))
}

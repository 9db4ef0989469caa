//! Constraint graph built from a trip's ordering rules.
//!
//! Every `before` entry becomes an edge from the point to its target and
//! every `after` entry an edge from its source to the point. A `first`
//! point gains an edge to every other point and every other point gains an
//! edge to the `last` point, so any topological order starts and ends in
//! the right place.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use thiserror::Error;

use crate::{Point, PointId};

/// Structural problems that make a trip impossible to order.
///
/// Each variant carries the offending point identifiers in input order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// The same identifier appears on more than one point.
    #[error("duplicate point ids: {}", IdList(.0))]
    DuplicatePointId(Vec<PointId>),
    /// More than one point is flagged `first`.
    #[error("multiple points flagged first: {}", IdList(.0))]
    MultiFirst(Vec<PointId>),
    /// More than one point is flagged `last`.
    #[error("multiple points flagged last: {}", IdList(.0))]
    MultiLast(Vec<PointId>),
    /// A point is flagged both `first` and `last`.
    #[error("points flagged both first and last: {}", IdList(.0))]
    SimultaneousFirstAndLast(Vec<PointId>),
    /// A constraint references a point that is not part of the trip.
    #[error("constraints reference unknown points: {}", IdList(.0))]
    UnknownNodeId(Vec<PointId>),
    /// The constraints contain one or more cycles.
    #[error("constraints form cycles: {}", CycleList(.0))]
    Cycle(Vec<Vec<PointId>>),
}

struct IdList<'a>(&'a [PointId]);

impl fmt::Display for IdList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, id) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.as_str())?;
        }
        Ok(())
    }
}

struct CycleList<'a>(&'a [Vec<PointId>]);

impl fmt::Display for CycleList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, cycle) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str("; ")?;
            }
            write!(f, "[{}]", IdList(cycle))?;
        }
        Ok(())
    }
}

/// Validated, acyclic precedence graph over a trip's points.
///
/// Nodes are addressed by their position in the input slice.
///
/// # Examples
/// ```
/// use wayfarer_core::{ConstraintGraph, GeoPointId, Point, StructuralError, TripId};
///
/// let trip = TripId::from("t");
/// let points = vec![
///     Point::new("a", trip.clone(), GeoPointId::new(1)).must_precede(["b"]),
///     Point::new("b", trip, GeoPointId::new(2)).must_precede(["a"]),
/// ];
/// let err = ConstraintGraph::build(points).unwrap_err();
/// assert!(matches!(err, StructuralError::Cycle(_)));
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintGraph {
    points: Vec<Point>,
    successors: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl ConstraintGraph {
    /// Validate `points` and build the precedence graph.
    ///
    /// Checks run in a fixed order and the first failing check is reported:
    /// duplicate ids, multiple `first`, multiple `last`, `first` and `last`
    /// on one point, unknown ids and finally cycles.
    pub fn build(points: Vec<Point>) -> Result<Self, StructuralError> {
        let index = index_points(&points)?;
        check_flags(&points)?;

        let mut unknown = Vec::new();
        let mut edges = EdgeSet::new(points.len());
        for (node, point) in points.iter().enumerate() {
            for target in &point.before {
                match index.get(target) {
                    Some(&other) => edges.insert(node, other),
                    None => unknown.push(target.clone()),
                }
            }
            for source in &point.after {
                match index.get(source) {
                    Some(&other) => edges.insert(other, node),
                    None => unknown.push(source.clone()),
                }
            }
        }
        if !unknown.is_empty() {
            let mut seen = HashSet::new();
            unknown.retain(|id| seen.insert(id.clone()));
            return Err(StructuralError::UnknownNodeId(unknown));
        }

        if let Some(first) = points.iter().position(|p| p.first) {
            for other in (0..points.len()).filter(|&n| n != first) {
                edges.insert(first, other);
            }
        }
        if let Some(last) = points.iter().position(|p| p.last) {
            for other in (0..points.len()).filter(|&n| n != last) {
                edges.insert(other, last);
            }
        }

        let (successors, in_degree) = edges.into_adjacency();
        let graph = Self {
            points,
            successors,
            in_degree,
        };
        let cycles = graph.find_cycles();
        if cycles.is_empty() {
            Ok(graph)
        } else {
            Err(StructuralError::Cycle(cycles))
        }
    }

    /// Points in input order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the graph has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at `node`.
    pub fn point(&self, node: usize) -> Option<&Point> {
        self.points.get(node)
    }

    /// Nodes that must follow `node`, in insertion order.
    pub fn successors(&self, node: usize) -> &[usize] {
        self.successors
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of distinct predecessors per node.
    pub fn in_degrees(&self) -> &[usize] {
        &self.in_degree
    }

    /// Every precedence edge as `(earlier, later)` identifiers.
    pub fn edges(&self) -> impl Iterator<Item = (&PointId, &PointId)> + '_ {
        self.successors.iter().enumerate().flat_map(move |(from, targets)| {
            targets
                .iter()
                .filter_map(move |&to| Some((&self.points.get(from)?.id, &self.points.get(to)?.id)))
        })
    }

    /// Kahn's algorithm followed by a depth-first walk of whatever it could
    /// not remove. Each back edge found by the walk yields one cycle, listed
    /// from the re-entered node to the node that closed it.
    fn find_cycles(&self) -> Vec<Vec<PointId>> {
        let mut in_degree = self.in_degree.clone();
        let mut queue: VecDeque<usize> = (0..self.len())
            .filter(|&node| in_degree.get(node) == Some(&0))
            .collect();
        while let Some(node) = queue.pop_front() {
            for &next in self.successors(node) {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        let residual: Vec<bool> = in_degree.iter().map(|&degree| degree > 0).collect();
        if !residual.contains(&true) {
            return Vec::new();
        }

        let mut state = vec![Visit::Unvisited; self.len()];
        let mut cycles = Vec::new();
        for root in (0..self.len()).filter(|&n| residual.get(n) == Some(&true)) {
            if state.get(root) == Some(&Visit::Unvisited) {
                self.walk_residual(root, &residual, &mut state, &mut cycles);
            }
        }
        cycles
    }

    fn walk_residual(
        &self,
        root: usize,
        residual: &[bool],
        state: &mut [Visit],
        cycles: &mut Vec<Vec<PointId>>,
    ) {
        let mut path = vec![root];
        let mut cursors = vec![0_usize];
        mark(state, root, Visit::OnStack);

        while let (Some(&node), Some(cursor)) = (path.last(), cursors.last_mut()) {
            let Some(&next) = self.successors(node).get(*cursor) else {
                mark(state, node, Visit::Done);
                path.pop();
                cursors.pop();
                continue;
            };
            *cursor += 1;
            if residual.get(next) != Some(&true) {
                continue;
            }
            match state.get(next).copied() {
                Some(Visit::Unvisited) => {
                    mark(state, next, Visit::OnStack);
                    path.push(next);
                    cursors.push(0);
                }
                Some(Visit::OnStack) => {
                    if let Some(start) = path.iter().position(|&n| n == next) {
                        let cycle = path
                            .iter()
                            .skip(start)
                            .filter_map(|&n| self.points.get(n).map(|p| p.id.clone()))
                            .collect();
                        cycles.push(cycle);
                    }
                }
                _ => {}
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnStack,
    Done,
}

fn mark(state: &mut [Visit], node: usize, visit: Visit) {
    if let Some(slot) = state.get_mut(node) {
        *slot = visit;
    }
}

fn index_points(points: &[Point]) -> Result<HashMap<PointId, usize>, StructuralError> {
    let mut index = HashMap::with_capacity(points.len());
    let mut duplicates = Vec::new();
    for (node, point) in points.iter().enumerate() {
        if index.insert(point.id.clone(), node).is_some() && !duplicates.contains(&point.id) {
            duplicates.push(point.id.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(index)
    } else {
        Err(StructuralError::DuplicatePointId(duplicates))
    }
}

fn check_flags(points: &[Point]) -> Result<(), StructuralError> {
    let flagged = |keep: fn(&Point) -> bool| -> Vec<PointId> {
        points
            .iter()
            .filter(|p| keep(p))
            .map(|p| p.id.clone())
            .collect()
    };
    let firsts = flagged(|p| p.first);
    if firsts.len() > 1 {
        return Err(StructuralError::MultiFirst(firsts));
    }
    let lasts = flagged(|p| p.last);
    if lasts.len() > 1 {
        return Err(StructuralError::MultiLast(lasts));
    }
    let both = flagged(|p| p.first && p.last);
    if !both.is_empty() {
        return Err(StructuralError::SimultaneousFirstAndLast(both));
    }
    Ok(())
}

/// Deduplicating edge accumulator.
struct EdgeSet {
    seen: HashSet<(usize, usize)>,
    successors: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl EdgeSet {
    fn new(nodes: usize) -> Self {
        Self {
            seen: HashSet::new(),
            successors: vec![Vec::new(); nodes],
            in_degree: vec![0; nodes],
        }
    }

    fn insert(&mut self, from: usize, to: usize) {
        if !self.seen.insert((from, to)) {
            return;
        }
        if let (Some(targets), Some(degree)) =
            (self.successors.get_mut(from), self.in_degree.get_mut(to))
        {
            targets.push(to);
            *degree += 1;
        }
    }

    fn into_adjacency(self) -> (Vec<Vec<usize>>, Vec<usize>) {
        (self.successors, self.in_degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoPointId, TripId};
    use rstest::{fixture, rstest};

    #[fixture]
    fn trip() -> TripId {
        TripId::from("trip")
    }

    fn point(trip: &TripId, id: &str) -> Point {
        Point::new(id, trip.clone(), GeoPointId::new(0))
    }

    fn ids(raw: &[&str]) -> Vec<PointId> {
        raw.iter().map(|id| PointId::from(*id)).collect()
    }

    #[rstest]
    fn before_and_after_produce_one_edge_each_way(trip: TripId) {
        let graph = ConstraintGraph::build(vec![
            point(&trip, "a").must_precede(["b"]),
            point(&trip, "b").must_follow(["a"]),
            point(&trip, "c").must_follow(["b"]),
        ])
        .expect("acyclic");
        let edges: Vec<_> = graph
            .edges()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        assert_eq!(edges, vec![("a", "b"), ("b", "c")]);
        assert_eq!(graph.in_degrees(), &[0, 1, 1]);
    }

    #[rstest]
    fn first_and_last_become_implicit_edges(trip: TripId) {
        let graph = ConstraintGraph::build(vec![
            point(&trip, "b"),
            point(&trip, "z").as_last(),
            point(&trip, "a").as_first(),
        ])
        .expect("acyclic");
        assert_eq!(graph.in_degrees(), &[1, 2, 0]);
        assert_eq!(graph.successors(2), &[0, 1]);
    }

    #[rstest]
    fn duplicates_are_reported_before_flags(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").as_first(),
            point(&trip, "a").as_first(),
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::DuplicatePointId(ids(&["a"])));
    }

    #[rstest]
    #[case::multi_first(
        vec![("a", true, false), ("b", true, false), ("c", false, true), ("d", false, true)],
        StructuralError::MultiFirst(ids(&["a", "b"]))
    )]
    #[case::multi_last(
        vec![("a", true, false), ("b", false, true), ("c", false, true)],
        StructuralError::MultiLast(ids(&["b", "c"]))
    )]
    #[case::simultaneous(
        vec![("a", true, true), ("b", false, false)],
        StructuralError::SimultaneousFirstAndLast(ids(&["a"]))
    )]
    fn flag_conflicts_follow_check_order(
        trip: TripId,
        #[case] flags: Vec<(&str, bool, bool)>,
        #[case] expected: StructuralError,
    ) {
        let points = flags
            .into_iter()
            .map(|(id, first, last)| {
                let mut p = point(&trip, id);
                p.first = first;
                p.last = last;
                p
            })
            .collect();
        assert_eq!(ConstraintGraph::build(points).unwrap_err(), expected);
    }

    #[rstest]
    fn unknown_ids_are_deduplicated(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").must_precede(["ghost", "b"]),
            point(&trip, "b").must_follow(["ghost", "phantom"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            StructuralError::UnknownNodeId(ids(&["ghost", "phantom"]))
        );
    }

    #[rstest]
    fn two_point_cycle_lists_both_members(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").must_precede(["b"]),
            point(&trip, "b").must_precede(["a"]),
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::Cycle(vec![ids(&["a", "b"])]));
    }

    #[rstest]
    fn self_reference_is_a_cycle(trip: TripId) {
        let err = ConstraintGraph::build(vec![point(&trip, "a").must_precede(["a"])]).unwrap_err();
        assert_eq!(err, StructuralError::Cycle(vec![ids(&["a"])]));
    }

    #[rstest]
    fn same_point_before_and_after_is_a_cycle(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").must_precede(["b"]).must_follow(["b"]),
            point(&trip, "b"),
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::Cycle(vec![ids(&["a", "b"])]));
    }

    #[rstest]
    fn cycle_excludes_nodes_merely_downstream(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "root").must_precede(["x"]),
            point(&trip, "x").must_precede(["y"]),
            point(&trip, "y").must_precede(["z", "x"]),
            point(&trip, "z"),
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::Cycle(vec![ids(&["x", "y"])]));
    }

    #[rstest]
    fn contradicting_first_is_a_cycle(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").as_first(),
            point(&trip, "b").must_precede(["a"]),
        ])
        .unwrap_err();
        assert_eq!(err, StructuralError::Cycle(vec![ids(&["a", "b"])]));
    }

    #[rstest]
    fn errors_name_offending_points(trip: TripId) {
        let err = ConstraintGraph::build(vec![
            point(&trip, "a").must_precede(["b"]),
            point(&trip, "b").must_precede(["a"]),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "constraints form cycles: [a, b]");
    }
}

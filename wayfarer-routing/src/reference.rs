//! Plain Dijkstra over the uncontracted edge set.
//!
//! Used to check contracted queries and as the benchmark baseline.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use wayfarer_core::{Cost, GeoEdge, GeoPointId, TransportMode};

/// Adjacency list of one transport mode's edges.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    outgoing: HashMap<GeoPointId, Vec<(GeoPointId, Cost)>>,
}

impl ReferenceGraph {
    /// Collect the `mode` edges of `edges`.
    #[must_use]
    pub fn new(edges: &[GeoEdge], mode: TransportMode) -> Self {
        let mut outgoing: HashMap<GeoPointId, Vec<(GeoPointId, Cost)>> = HashMap::new();
        for edge in edges {
            if let Some(cost) = edge.cost_for(mode) {
                outgoing.entry(edge.from).or_default().push((edge.to, cost));
            }
        }
        Self { outgoing }
    }

    /// Cost of the cheapest route from `source` to `target`, if any.
    #[must_use]
    pub fn distance(&self, source: GeoPointId, target: GeoPointId) -> Option<Cost> {
        let mut best: HashMap<GeoPointId, Cost> = HashMap::from([(source, Cost::ZERO)]);
        let mut queue = BinaryHeap::from([Reverse((Cost::ZERO, source))]);
        while let Some(Reverse((cost, vertex))) = queue.pop() {
            if vertex == target {
                return Some(cost);
            }
            if best.get(&vertex).is_some_and(|&known| cost > known) {
                continue;
            }
            for &(next, step) in self.outgoing.get(&vertex).map(Vec::as_slice).unwrap_or_default() {
                let candidate = cost + step;
                if best.get(&next).is_none_or(|&known| candidate < known) {
                    best.insert(next, candidate);
                    queue.push(Reverse((candidate, next)));
                }
            }
        }
        None
    }
}

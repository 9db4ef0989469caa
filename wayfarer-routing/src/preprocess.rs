//! Contraction hierarchy preprocessing.
//!
//! Vertices are contracted one at a time in order of an edge-difference
//! importance estimate. Contracting `v` adds a shortcut `u -> w` for every
//! pair of remaining neighbours whose cheapest connection runs through `v`.
//! A bounded witness search from `u` that avoids `v` decides this: any
//! path to `w` no dearer than `u -> v -> w` makes the shortcut redundant.
//! Importance is re-evaluated lazily when a vertex reaches the front of the
//! queue.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use wayfarer_core::{CancellationFlag, Cancelled, Cost, EdgeId, GeoEdge, GeoPointId, TransportMode};

use crate::graph::{ArcId, ArcKind, ContractedGraph, GraphArc};

/// Tuning knobs for [`contract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractionConfig {
    /// Vertices a single witness search may settle before giving up and
    /// keeping the shortcut.
    pub settle_limit: usize,
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self { settle_limit: 500 }
    }
}

/// Contract the `mode` subgraph of `edges`.
///
/// Every id in `vertices` becomes a vertex, as does every endpoint of an
/// edge. Edges without a `mode` cost are skipped, self loops are dropped and
/// parallel edges collapse to the cheapest (lowest id on equal cost).
///
/// # Errors
///
/// Returns [`Cancelled`] once `cancel` is raised; the flag is polled once
/// per contracted vertex.
///
/// # Examples
/// ```
/// use wayfarer_core::{CancellationFlag, Cost, EdgeId, GeoEdge, GeoPointId, TransportMode};
/// use wayfarer_routing::{ContractionConfig, contract};
///
/// let edge = |id, from, to| {
///     GeoEdge::new(EdgeId::new(id), GeoPointId::new(from), GeoPointId::new(to))
///         .with_cost(TransportMode::Walk, Cost::new(1))
/// };
/// let graph = contract(
///     [],
///     &[edge(1, 1, 2), edge(2, 2, 3)],
///     TransportMode::Walk,
///     &ContractionConfig::default(),
///     &CancellationFlag::new(),
/// )?;
/// assert_eq!(graph.vertex_count(), 3);
/// # Ok::<(), wayfarer_core::Cancelled>(())
/// ```
pub fn contract<I>(
    vertices: I,
    edges: &[GeoEdge],
    mode: TransportMode,
    config: &ContractionConfig,
    cancel: &CancellationFlag,
) -> Result<ContractedGraph, Cancelled>
where
    I: IntoIterator<Item = GeoPointId>,
{
    let mut ids: Vec<GeoPointId> = vertices
        .into_iter()
        .chain(edges.iter().flat_map(|edge| [edge.from, edge.to]))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let mut contractor = Contractor::new(&ids, edges, mode, config);
    let rank = contractor.run(cancel)?;
    let originals = contractor.arcs.len() - contractor.shortcuts;
    info!(
        "contracted {} {mode} vertices: {originals} arcs plus {} shortcuts",
        ids.len(),
        contractor.shortcuts
    );
    let arcs = contractor.arcs;
    Ok(ContractedGraph::from_parts(mode, ids, rank, arcs))
}

/// Shortcut proposed while evaluating a vertex, in vertex positions.
struct Shortcut {
    from: usize,
    to: usize,
    cost: Cost,
    first: usize,
    second: usize,
}

struct Contractor<'a> {
    config: &'a ContractionConfig,
    ids: &'a [GeoPointId],
    arcs: Vec<GraphArc>,
    ends: Vec<(usize, usize)>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    contracted: Vec<bool>,
    shortcuts: usize,
}

impl<'a> Contractor<'a> {
    fn new(
        ids: &'a [GeoPointId],
        edges: &[GeoEdge],
        mode: TransportMode,
        config: &'a ContractionConfig,
    ) -> Self {
        let positions: HashMap<GeoPointId, usize> = ids
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        let mut cheapest: BTreeMap<(usize, usize), (Cost, EdgeId)> = BTreeMap::new();
        for edge in edges {
            let Some(cost) = edge.cost_for(mode) else {
                continue;
            };
            let (Some(&from), Some(&to)) = (positions.get(&edge.from), positions.get(&edge.to))
            else {
                continue;
            };
            if from == to {
                continue;
            }
            cheapest
                .entry((from, to))
                .and_modify(|best| *best = (*best).min((cost, edge.id)))
                .or_insert((cost, edge.id));
        }

        let mut contractor = Self {
            config,
            ids,
            arcs: Vec::with_capacity(cheapest.len()),
            ends: Vec::with_capacity(cheapest.len()),
            outgoing: vec![Vec::new(); ids.len()],
            incoming: vec![Vec::new(); ids.len()],
            contracted: vec![false; ids.len()],
            shortcuts: 0,
        };
        for ((from, to), (cost, edge)) in cheapest {
            contractor.push_arc(from, to, cost, ArcKind::Original(edge));
        }
        contractor
    }

    fn push_arc(&mut self, from: usize, to: usize, cost: Cost, kind: ArcKind) {
        let (Some(&tail), Some(&head)) = (self.ids.get(from), self.ids.get(to)) else {
            return;
        };
        let position = self.arcs.len();
        self.arcs.push(GraphArc {
            from: tail,
            to: head,
            cost,
            kind,
        });
        self.ends.push((from, to));
        if let Some(list) = self.outgoing.get_mut(from) {
            list.push(position);
        }
        if let Some(list) = self.incoming.get_mut(to) {
            list.push(position);
        }
    }

    /// Contract every vertex and return each vertex's contraction position.
    fn run(&mut self, cancel: &CancellationFlag) -> Result<Vec<usize>, Cancelled> {
        let mut queue = BinaryHeap::with_capacity(self.ids.len());
        for vertex in 0..self.ids.len() {
            let (_, importance) = self.evaluate(vertex);
            queue.push(Reverse((importance, vertex)));
        }

        let mut rank = vec![0; self.ids.len()];
        let mut next_rank = 0;
        while let Some(Reverse((priority, vertex))) = queue.pop() {
            cancel.check()?;
            if self.is_contracted(vertex) {
                continue;
            }
            let (shortcuts, importance) = self.evaluate(vertex);
            if importance > priority
                && queue
                    .peek()
                    .is_some_and(|Reverse(front)| *front < (importance, vertex))
            {
                queue.push(Reverse((importance, vertex)));
                continue;
            }
            for shortcut in shortcuts {
                self.push_arc(
                    shortcut.from,
                    shortcut.to,
                    shortcut.cost,
                    ArcKind::Shortcut {
                        first: ArcId::new(shortcut.first),
                        second: ArcId::new(shortcut.second),
                    },
                );
                self.shortcuts += 1;
            }
            if let Some(flag) = self.contracted.get_mut(vertex) {
                *flag = true;
            }
            if let Some(slot) = rank.get_mut(vertex) {
                *slot = next_rank;
            }
            next_rank += 1;
        }
        debug!("contraction added {} shortcuts", self.shortcuts);
        Ok(rank)
    }

    fn is_contracted(&self, vertex: usize) -> bool {
        self.contracted.get(vertex).copied().unwrap_or(true)
    }

    /// Cheapest arc per remaining neighbour, keyed by neighbour position.
    fn neighbours(
        &self,
        vertex: usize,
        adjacency: &[Vec<usize>],
        outward: bool,
    ) -> BTreeMap<usize, (Cost, usize)> {
        let mut cheapest: BTreeMap<usize, (Cost, usize)> = BTreeMap::new();
        for &arc in adjacency.get(vertex).map(Vec::as_slice).unwrap_or_default() {
            let (Some(&(from, to)), Some(stored)) = (self.ends.get(arc), self.arcs.get(arc))
            else {
                continue;
            };
            let neighbour = if outward { to } else { from };
            if neighbour == vertex || self.is_contracted(neighbour) {
                continue;
            }
            cheapest
                .entry(neighbour)
                .and_modify(|best| *best = (*best).min((stored.cost, arc)))
                .or_insert((stored.cost, arc));
        }
        cheapest
    }

    /// Shortcuts contracting `vertex` would need, and its importance.
    fn evaluate(&self, vertex: usize) -> (Vec<Shortcut>, i64) {
        let sources = self.neighbours(vertex, &self.incoming, false);
        let targets = self.neighbours(vertex, &self.outgoing, true);
        let mut shortcuts = Vec::new();
        for (&source, &(into_cost, into_arc)) in &sources {
            let Some(bound) = targets
                .iter()
                .filter(|&(&target, _)| target != source)
                .map(|(_, &(out_cost, _))| into_cost + out_cost)
                .max()
            else {
                continue;
            };
            let reached = self.witness_search(source, vertex, bound);
            for (&target, &(out_cost, out_arc)) in &targets {
                if target == source {
                    continue;
                }
                let direct = into_cost + out_cost;
                if reached.get(&target).is_some_and(|&cost| cost <= direct) {
                    continue;
                }
                shortcuts.push(Shortcut {
                    from: source,
                    to: target,
                    cost: direct,
                    first: into_arc,
                    second: out_arc,
                });
            }
        }
        let importance = signed(shortcuts.len()) - signed(sources.len()) - signed(targets.len());
        (shortcuts, importance)
    }

    /// Dijkstra from `source` over remaining vertices other than `excluded`,
    /// abandoned past `bound` or after the configured number of settles.
    fn witness_search(&self, source: usize, excluded: usize, bound: Cost) -> HashMap<usize, Cost> {
        let mut distance = HashMap::from([(source, Cost::ZERO)]);
        let mut queue = BinaryHeap::from([Reverse((Cost::ZERO, source))]);
        let mut settled = 0;
        while let Some(Reverse((cost, vertex))) = queue.pop() {
            if cost > bound || settled >= self.config.settle_limit {
                break;
            }
            if distance.get(&vertex).is_some_and(|&best| cost > best) {
                continue;
            }
            settled += 1;
            for &arc in self.outgoing.get(vertex).map(Vec::as_slice).unwrap_or_default() {
                let (Some(&(_, next)), Some(stored)) = (self.ends.get(arc), self.arcs.get(arc))
                else {
                    continue;
                };
                if next == excluded || self.is_contracted(next) {
                    continue;
                }
                let candidate = cost + stored.cost;
                if candidate > bound {
                    continue;
                }
                if distance.get(&next).is_none_or(|&best| candidate < best) {
                    distance.insert(next, candidate);
                    queue.push(Reverse((candidate, next)));
                }
            }
        }
        distance
    }
}

fn signed(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

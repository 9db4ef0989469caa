//! Contracted route graph and the traits queries read it through.
//!
//! A [`ContractedGraph`] holds every original arc of one transport mode
//! plus the shortcuts added during contraction. Each vertex keeps two
//! adjacency lists: arcs leading to vertices contracted later (searched by
//! the forward half of a query) and arcs arriving from vertices contracted
//! later (searched by the backward half).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use wayfarer_core::{Cost, EdgeId, GeoPointId, TransportMode};

/// Position of an arc in a contracted graph's arc table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcId(usize);

impl ArcId {
    /// Wrap a raw arc table position.
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw arc table position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Directed arc stored in the arc table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphArc {
    /// Tail vertex.
    pub from: GeoPointId,
    /// Head vertex.
    pub to: GeoPointId,
    /// Cost of traversing the arc.
    pub cost: Cost,
    /// What the arc stands for.
    pub kind: ArcKind,
}

/// Whether an arc is an original edge or a shortcut over two other arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcKind {
    /// Cheapest original edge between the endpoints.
    Original(EdgeId),
    /// Bypass of a contracted vertex: `first` ends where `second` starts.
    Shortcut {
        /// Arc into the contracted vertex.
        first: ArcId,
        /// Arc out of the contracted vertex.
        second: ArcId,
    },
}

/// Arc as seen from one of its endpoints during a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpwardArc {
    /// Vertex at the other end of the arc.
    pub neighbour: GeoPointId,
    /// Cost of the arc.
    pub cost: Cost,
    /// Arc handle for path unpacking.
    pub arc: ArcId,
}

/// Read access to the upward search space of a contracted graph.
pub trait UpwardGraph {
    /// Whether `vertex` belongs to the graph.
    fn contains(&self, vertex: GeoPointId) -> bool;

    /// Arcs leaving `vertex` towards more important vertices.
    fn edges_to_higher_importance(&self, vertex: GeoPointId) -> &[UpwardArc];

    /// Arcs entering `vertex` from more important vertices. The
    /// `neighbour` of each entry is the arc's tail.
    fn edges_from_higher_importance(&self, vertex: GeoPointId) -> &[UpwardArc];
}

/// Expand an arc into what it represents.
pub trait EdgeResolver {
    /// The stored arc for `arc`, or `None` when the handle is unknown.
    fn resolve_edge(&self, arc: ArcId) -> Option<&GraphArc>;
}

/// Contraction hierarchy over a single transport mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractedGraph {
    mode: TransportMode,
    vertices: Vec<GeoPointId>,
    positions: HashMap<GeoPointId, usize>,
    rank: Vec<usize>,
    arcs: Vec<GraphArc>,
    upward_out: Vec<Vec<UpwardArc>>,
    upward_in: Vec<Vec<UpwardArc>>,
    shortcuts: usize,
}

impl ContractedGraph {
    /// Assemble a graph from its contraction output.
    ///
    /// `rank[i]` is the contraction position of `vertices[i]`. Arcs whose
    /// endpoints are missing from `vertices` are ignored.
    pub(crate) fn from_parts(
        mode: TransportMode,
        vertices: Vec<GeoPointId>,
        rank: Vec<usize>,
        arcs: Vec<GraphArc>,
    ) -> Self {
        let positions: HashMap<GeoPointId, usize> = vertices
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        let mut upward_out = vec![Vec::new(); vertices.len()];
        let mut upward_in = vec![Vec::new(); vertices.len()];
        let mut shortcuts = 0;
        for (position, arc) in arcs.iter().enumerate() {
            if matches!(arc.kind, ArcKind::Shortcut { .. }) {
                shortcuts += 1;
            }
            let (Some(&tail), Some(&head)) = (positions.get(&arc.from), positions.get(&arc.to))
            else {
                continue;
            };
            let (Some(tail_rank), Some(head_rank)) = (rank.get(tail), rank.get(head)) else {
                continue;
            };
            let id = ArcId::new(position);
            if head_rank > tail_rank {
                if let Some(list) = upward_out.get_mut(tail) {
                    list.push(UpwardArc {
                        neighbour: arc.to,
                        cost: arc.cost,
                        arc: id,
                    });
                }
            } else if tail_rank > head_rank
                && let Some(list) = upward_in.get_mut(head)
            {
                list.push(UpwardArc {
                    neighbour: arc.from,
                    cost: arc.cost,
                    arc: id,
                });
            }
        }
        Self {
            mode,
            vertices,
            positions,
            rank,
            arcs,
            upward_out,
            upward_in,
            shortcuts,
        }
    }

    /// Transport mode the graph was built for.
    #[must_use]
    pub const fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of arcs, shortcuts included.
    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Number of shortcut arcs.
    #[must_use]
    pub const fn shortcut_count(&self) -> usize {
        self.shortcuts
    }

    /// Contraction position of `vertex`; higher means more important.
    #[must_use]
    pub fn rank(&self, vertex: GeoPointId) -> Option<usize> {
        let position = self.positions.get(&vertex)?;
        self.rank.get(*position).copied()
    }

    /// Every arc in table order.
    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &GraphArc)> {
        self.arcs
            .iter()
            .enumerate()
            .map(|(position, arc)| (ArcId::new(position), arc))
    }
}

impl UpwardGraph for ContractedGraph {
    fn contains(&self, vertex: GeoPointId) -> bool {
        self.positions.contains_key(&vertex)
    }

    fn edges_to_higher_importance(&self, vertex: GeoPointId) -> &[UpwardArc] {
        self.positions
            .get(&vertex)
            .and_then(|&position| self.upward_out.get(position))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn edges_from_higher_importance(&self, vertex: GeoPointId) -> &[UpwardArc] {
        self.positions
            .get(&vertex)
            .and_then(|&position| self.upward_in.get(position))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl EdgeResolver for ContractedGraph {
    fn resolve_edge(&self, arc: ArcId) -> Option<&GraphArc> {
        self.arcs.get(arc.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn id(raw: u64) -> GeoPointId {
        GeoPointId::new(raw)
    }

    fn original(from: u64, to: u64, cost: u64, edge: u64) -> GraphArc {
        GraphArc {
            from: id(from),
            to: id(to),
            cost: Cost::new(cost),
            kind: ArcKind::Original(EdgeId::new(edge)),
        }
    }

    #[fixture]
    fn path_graph() -> ContractedGraph {
        // 1 -> 2 -> 3 with 2 contracted first.
        let arcs = vec![
            original(1, 2, 4, 10),
            original(2, 3, 5, 11),
            GraphArc {
                from: id(1),
                to: id(3),
                cost: Cost::new(9),
                kind: ArcKind::Shortcut {
                    first: ArcId::new(0),
                    second: ArcId::new(1),
                },
            },
        ];
        ContractedGraph::from_parts(
            TransportMode::Walk,
            vec![id(1), id(2), id(3)],
            vec![1, 0, 2],
            arcs,
        )
    }

    #[rstest]
    fn splits_arcs_by_rank(path_graph: ContractedGraph) {
        let up: Vec<_> = path_graph
            .edges_to_higher_importance(id(1))
            .iter()
            .map(|arc| arc.neighbour)
            .collect();
        assert_eq!(up, vec![id(3)]);

        let down_into_two: Vec<_> = path_graph
            .edges_from_higher_importance(id(2))
            .iter()
            .map(|arc| arc.neighbour)
            .collect();
        assert_eq!(down_into_two, vec![id(1)]);

        assert!(path_graph.edges_to_higher_importance(id(2)).len() == 1);
        assert_eq!(path_graph.shortcut_count(), 1);
        assert_eq!(path_graph.arc_count(), 3);
    }

    #[rstest]
    fn unknown_vertices_have_no_arcs(path_graph: ContractedGraph) {
        assert!(!path_graph.contains(id(99)));
        assert!(path_graph.edges_to_higher_importance(id(99)).is_empty());
        assert!(path_graph.edges_from_higher_importance(id(99)).is_empty());
        assert_eq!(path_graph.rank(id(99)), None);
    }

    #[rstest]
    fn resolves_shortcuts_to_their_halves(path_graph: ContractedGraph) {
        let shortcut = path_graph.resolve_edge(ArcId::new(2)).expect("shortcut");
        assert_eq!(
            shortcut.kind,
            ArcKind::Shortcut {
                first: ArcId::new(0),
                second: ArcId::new(1)
            }
        );
        assert!(path_graph.resolve_edge(ArcId::new(3)).is_none());
    }
}

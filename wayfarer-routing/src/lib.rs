//! Contraction-hierarchy routing for Wayfarer.
//!
//! This crate turns the transit edge set into one [`ContractedGraph`] per
//! transport mode, answers shortest-route queries with a bidirectional
//! upward search that keeps every equally short route, and assembles
//! routed [`TripPlan`](wayfarer_core::TripPlan)s through
//! [`ContractionPlanner`], the default implementation of the
//! [`TripPlanner`](wayfarer_core::TripPlanner) trait.
//!
//! Query-time state lives in an immutable [`RouteIndex`]. A
//! [`RouteIndexHandle`] publishes new indices atomically; requests take a
//! snapshot and keep it for their whole lifetime. Indices can be persisted
//! with [`write_route_index`] and loaded with [`read_route_index`].

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod graph;
mod index;
mod persist;
mod planner;
mod preprocess;
mod query;
mod reference;

pub use graph::{ArcId, ArcKind, ContractedGraph, EdgeResolver, GraphArc, UpwardArc, UpwardGraph};
pub use index::{RouteIndex, RouteIndexHandle};
pub use persist::{RouteIndexError, RouteIndexWriteError, read_route_index, write_route_index};
pub use planner::{ContractionPlanner, PlannerConfig};
pub use preprocess::{ContractionConfig, contract};
pub use query::{QueryError, shortest_paths};
pub use reference::ReferenceGraph;

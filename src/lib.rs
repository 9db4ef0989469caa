//! Wayfarer trip-planning engine.
//!
//! This facade re-exports the domain model and planning primitives from
//! `wayfarer-core` together with the contraction-hierarchy routing engine
//! and trip plan assembler from `wayfarer-routing`.

pub use wayfarer_core::*;
pub use wayfarer_routing::{
    ContractedGraph, ContractionConfig, ContractionPlanner, PlannerConfig, QueryError, RouteIndex,
    RouteIndexError, RouteIndexHandle, RouteIndexWriteError, UpwardGraph, read_route_index,
    write_route_index,
};

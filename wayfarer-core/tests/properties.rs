//! Property tests for order enumeration and radius queries.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use geo::{Coord, Distance, Haversine, Point as GeoPosition};
use proptest::prelude::*;
use wayfarer_core::{
    CancellationFlag, ConstraintGraph, GeoIndex, GeoPoint, GeoPointId, GeohashGrid, Point,
    PointId, TripId, enumerate_orders,
};

const MAX_POINTS: usize = 6;

/// Points `p0..pn` where `mask` selects forward edges `pi -> pj` for `i < j`.
fn dag(n: usize, mask: &[bool], visits: &[(u8, Option<u8>)]) -> Vec<Point> {
    let trip = TripId::from("prop");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut bits = mask.iter().copied();
    (0..n)
        .map(|i| {
            let targets: Vec<String> = ((i + 1)..n)
                .filter(|_| bits.next().unwrap_or(false))
                .map(|j| format!("p{j}"))
                .collect();
            let (hours, deadline) = visits.get(i).copied().unwrap_or((0, None));
            let mut point = Point::new(format!("p{i}"), trip.clone(), GeoPointId::new(i as u64))
                .must_precede(targets)
                .with_duration(Duration::from_secs(u64::from(hours) * 3_600));
            if let Some(limit) = deadline {
                point = point.with_deadline(start + TimeDelta::hours(i64::from(limit)));
            }
            point
        })
        .collect()
}

proptest! {
    #[test]
    fn orders_respect_edges_and_deadlines(
        n in 1..=MAX_POINTS,
        mask in prop::collection::vec(any::<bool>(), MAX_POINTS * MAX_POINTS),
        visits in prop::collection::vec((0u8..3, prop::option::of(0u8..6)), MAX_POINTS),
        limit in 1usize..30,
    ) {
        let points = dag(n, &mask, &visits);
        let graph = ConstraintGraph::build(points.clone()).expect("forward edges are acyclic");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let orders = enumerate_orders(&graph, start, limit, &CancellationFlag::new())
            .expect("not cancelled");

        prop_assert!(orders.len() <= limit);
        let distinct: HashSet<_> = orders.iter().collect();
        prop_assert_eq!(distinct.len(), orders.len());

        for order in &orders {
            prop_assert_eq!(order.len(), n);
            for (from, to) in graph.edges() {
                prop_assert!(order.position(from) < order.position(to));
            }
            let mut clock = start;
            for id in order.points() {
                let point = points.iter().find(|p| &p.id == id).expect("known point");
                if let Some(deadline) = point.deadline {
                    prop_assert!(clock <= deadline, "{} reached after its deadline", id);
                }
                if let Some(duration) = point.duration {
                    clock += TimeDelta::from_std(duration).unwrap();
                }
            }
        }
    }

    #[test]
    fn enumeration_is_deterministic(
        n in 1..=MAX_POINTS,
        mask in prop::collection::vec(any::<bool>(), MAX_POINTS * MAX_POINTS),
    ) {
        let graph = ConstraintGraph::build(dag(n, &mask, &[])).expect("acyclic");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let cancel = CancellationFlag::new();
        let once = enumerate_orders(&graph, start, 50, &cancel).expect("not cancelled");
        let twice = enumerate_orders(&graph, start, 50, &cancel).expect("not cancelled");
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn index_matches_brute_force(
        coords in prop::collection::vec((139.60f64..139.90, 35.55f64..35.80), 0..60),
        centre in (139.60f64..139.90, 35.55f64..35.80),
        radius in 0.0f64..5_000.0,
    ) {
        let points: Vec<GeoPoint> = coords
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| GeoPoint::new(GeoPointId::new(id as u64), Coord { x, y }))
            .collect();
        let index = GeoIndex::from_points(GeohashGrid::default(), points.clone());
        let centre = Coord { x: centre.0, y: centre.1 };

        let mut found: Vec<u64> = index
            .nearby(centre, radius)
            .expect("valid radius")
            .iter()
            .map(|point| point.id.get())
            .collect();
        found.sort_unstable();
        let expected: Vec<u64> = points
            .iter()
            .filter(|point| {
                Haversine.distance(GeoPosition::from(centre), point.point()) <= radius
            })
            .map(|point| point.id.get())
            .collect();
        prop_assert_eq!(found, expected);
    }
}

#[test]
fn pinned_ids_survive_enumeration() {
    let graph = ConstraintGraph::build(dag(3, &[true, false, true], &[])).expect("acyclic");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let orders = enumerate_orders(&graph, start, 5, &CancellationFlag::new()).expect("ok");
    let expected: Vec<PointId> = ["p0", "p1", "p2"].into_iter().map(PointId::from).collect();
    assert_eq!(orders.first().map(|o| o.points().to_vec()), Some(expected));
}

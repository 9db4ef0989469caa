//! Behavioural tests for routing and trip plan assembly.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use wayfarer_core::test_support::{SqliteFixture, sample_network};
use wayfarer_core::{
    CancellationFlag, Cost, GeoPointId, PlanError, PlanStatus, PointId, RoutePath, TransportMode,
    TripId, TripPlan, TripPlanner,
};
use wayfarer_routing::{
    ContractionConfig, ContractionPlanner, PlannerConfig, RouteIndex, RouteIndexHandle,
};

struct Network {
    fixture: SqliteFixture,
    handle: Arc<RouteIndexHandle>,
}

#[derive(Default)]
struct Outcome {
    plans: Option<Result<Vec<TripPlan>, PlanError>>,
    routes: Option<Vec<RoutePath>>,
    snapshot: Option<Arc<RouteIndex>>,
}

fn build(fixture: &SqliteFixture) -> RouteIndex {
    RouteIndex::build(
        fixture.geo_points.clone(),
        &fixture.edges,
        fixture.grid,
        &ContractionConfig::default(),
        &CancellationFlag::new(),
    )
    .expect("not cancelled")
}

fn ids(plan: &TripPlan) -> Vec<&str> {
    plan.order.points().iter().map(PointId::as_str).collect()
}

fn walk(index: &RouteIndex, from: u64, to: u64) -> Vec<RoutePath> {
    index
        .shortest_path(
            GeoPointId::new(from),
            GeoPointId::new(to),
            TransportMode::Walk,
            &CancellationFlag::new(),
        )
        .expect("query runs")
}

#[fixture]
fn network() -> RefCell<Option<Network>> {
    RefCell::new(None)
}

#[fixture]
fn outcome() -> RefCell<Outcome> {
    RefCell::new(Outcome::default())
}

#[given("the Tokyo walking network")]
fn given_network(#[from(network)] network: &RefCell<Option<Network>>) {
    let fixture = sample_network();
    let handle = Arc::new(RouteIndexHandle::new(build(&fixture)));
    *network.borrow_mut() = Some(Network { fixture, handle });
}

fn plan(network: &RefCell<Option<Network>>, outcome: &RefCell<Outcome>, trip: &TripId) {
    let network = network.borrow();
    let network = network.as_ref().expect("network built");
    let planner = ContractionPlanner::with_config(
        network.fixture.memory_store(),
        Arc::clone(&network.handle),
        PlannerConfig {
            max_entry_points: 1,
            ..PlannerConfig::default()
        },
    );
    outcome.borrow_mut().plans = Some(planner.plan_trip(trip, 10, &CancellationFlag::new()));
}

#[when("I plan the tokyo-day trip")]
fn when_plan(
    #[from(network)] network: &RefCell<Option<Network>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    plan(network, outcome, &TripId::from("tokyo-day"));
}

#[when("I plan a trip that does not exist")]
fn when_plan_missing(
    #[from(network)] network: &RefCell<Option<Network>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    plan(network, outcome, &TripId::from("missing"));
}

#[when("I route from Tokyo to Shimbashi on foot")]
fn when_route(
    #[from(network)] network: &RefCell<Option<Network>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    let network = network.borrow();
    let network = network.as_ref().expect("network built");
    outcome.borrow_mut().routes = Some(walk(&network.handle.current(), 1, 5));
}

#[when("I take a snapshot and publish a rebuilt index")]
fn when_publish(
    #[from(network)] network: &RefCell<Option<Network>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    let network = network.borrow();
    let network = network.as_ref().expect("network built");
    outcome.borrow_mut().snapshot = Some(network.handle.current());
    let version = network.handle.publish(build(&network.fixture));
    assert_eq!(version, 2);
}

fn plans(outcome: &RefCell<Outcome>) -> Vec<TripPlan> {
    match outcome.borrow_mut().plans.take() {
        Some(Ok(plans)) => plans,
        other => panic!("expected plans, got {other:?}"),
    }
}

#[then("the first plan visits hotel, museum, gallery, dinner within budget")]
fn then_first_plan(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let plans = plans(outcome);
    let first = plans.first().expect("a plan");
    assert_eq!(ids(first), ["hotel", "museum", "gallery", "dinner"]);
    assert_eq!(first.status, PlanStatus::Feasible);
    assert_eq!(first.total_cost, Cost::new(68));
    outcome.borrow_mut().plans = Some(Ok(plans));
}

#[then("the second plan visits the gallery before the museum over budget")]
fn then_second_plan(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let plans = plans(outcome);
    let second = plans.get(1).expect("two plans");
    assert_eq!(ids(second), ["hotel", "gallery", "museum", "dinner"]);
    assert_eq!(second.status, PlanStatus::OverBudget);
    assert_eq!(second.total_cost, Cost::new(90));
}

#[then("the route passes Ginza at a cost of 20")]
fn then_route(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let outcome = outcome.borrow();
    let routes = outcome.routes.as_ref().expect("route queried");
    assert_eq!(routes.len(), 1);
    let route = routes.first().expect("one route");
    assert_eq!(route.cost, Cost::new(20));
    assert!(route.vertices.contains(&GeoPointId::new(6)));
}

#[then("planning reports the trip was not found")]
fn then_not_found(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let outcome = outcome.borrow();
    assert!(matches!(
        outcome.plans,
        Some(Err(PlanError::TripNotFound { .. }))
    ));
}

#[then("the handle serves version 2")]
fn then_version(#[from(network)] network: &RefCell<Option<Network>>) {
    let network = network.borrow();
    let network = network.as_ref().expect("network built");
    assert_eq!(network.handle.current().version(), 2);
}

#[then("the earlier snapshot still routes from Tokyo to Shimbashi")]
fn then_snapshot_routes(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let outcome = outcome.borrow();
    let snapshot = outcome.snapshot.as_ref().expect("snapshot taken");
    assert_eq!(snapshot.version(), 1);
    let routes = walk(snapshot, 1, 5);
    assert!(routes.iter().all(|route| route.cost == Cost::new(20)));
    assert!(!routes.is_empty());
}

#[scenario(path = "tests/features/trip_planning.feature", index = 0)]
fn scenario_plans_sorted(network: RefCell<Option<Network>>, outcome: RefCell<Outcome>) {
    let _ = (network, outcome);
}

#[scenario(path = "tests/features/trip_planning.feature", index = 1)]
fn scenario_walking_route(network: RefCell<Option<Network>>, outcome: RefCell<Outcome>) {
    let _ = (network, outcome);
}

#[scenario(path = "tests/features/trip_planning.feature", index = 2)]
fn scenario_unknown_trip(network: RefCell<Option<Network>>, outcome: RefCell<Outcome>) {
    let _ = (network, outcome);
}

#[scenario(path = "tests/features/trip_planning.feature", index = 3)]
fn scenario_publish(network: RefCell<Option<Network>>, outcome: RefCell<Outcome>) {
    let _ = (network, outcome);
}

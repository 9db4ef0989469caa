//! Behaviour-driven step definitions driving the CLI scenarios.

#![cfg(feature = "store-sqlite")]

use super::helpers::{Workspace, invoke};
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

#[derive(Debug)]
struct CliWorld {
    workspace: Workspace,
    result: RefCell<Option<Result<(), CliError>>>,
    stdout: RefCell<String>,
}

impl CliWorld {
    fn run(&self, args: &[&str]) {
        let (outcome, printed) = invoke(args);
        self.result.replace(Some(outcome));
        self.stdout.replace(printed);
    }

    fn output(&self) -> Value {
        let borrowed = self.result.borrow();
        borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect("expected success");
        serde_json::from_str(&self.stdout.borrow()).expect("output should be JSON")
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld {
        workspace: Workspace::new(),
        result: RefCell::new(None),
        stdout: RefCell::new(String::new()),
    }
}

#[given("the Tokyo trip store exists on disk")]
fn trip_store_exists(#[from(world)] world: &CliWorld) {
    world.workspace.write_network();
}

#[given("the route index has been built")]
fn route_index_built(#[from(world)] world: &CliWorld) {
    world.workspace.build_index();
}

#[when("I run build-index")]
fn run_build_index(#[from(world)] world: &CliWorld) {
    let database = world.workspace.database();
    let index = world.workspace.index();
    world.run(&[
        "build-index",
        "--database",
        database.as_str(),
        "--output",
        index.as_str(),
    ]);
}

#[when("I plan the tokyo-day trip")]
fn run_plan(#[from(world)] world: &CliWorld) {
    let database = world.workspace.database();
    let index = world.workspace.index();
    world.run(&[
        "plan",
        "--trip",
        "tokyo-day",
        "--database",
        database.as_str(),
        "--index",
        index.as_str(),
    ]);
}

#[when("I route from station 1 to station 5 on foot")]
fn run_route(#[from(world)] world: &CliWorld) {
    let index = world.workspace.index();
    world.run(&[
        "route",
        "--from",
        "1",
        "--to",
        "5",
        "--mode",
        "walk",
        "--index",
        index.as_str(),
    ]);
}

#[when("I list stations within 900 metres of Tokyo station")]
fn run_nearby(#[from(world)] world: &CliWorld) {
    let index = world.workspace.index();
    world.run(&[
        "nearby",
        "--lon",
        "139.7671",
        "--lat",
        "35.6812",
        "--radius",
        "900",
        "--index",
        index.as_str(),
    ]);
}

#[then("the command succeeds and reports the walk and train graphs")]
fn build_succeeds(#[from(world)] world: &CliWorld) {
    let summary = world.output();
    assert_eq!(summary["modes"], serde_json::json!(["walk", "train"]));
    assert_eq!(summary["vertices"], 6);
    assert_eq!(summary["edges"], 14);
    assert!(world.workspace.index().is_file());
}

#[then("the command prints plans with a feasible plan first")]
fn plan_succeeds(#[from(world)] world: &CliWorld) {
    let plans = world.output();
    let plans = plans.as_array().expect("plans array");
    assert_eq!(plans.len(), 2);
    let first = plans.first().expect("a plan");
    assert_eq!(first["status"], "feasible");
    assert_eq!(first["order"][0], "hotel");
    assert_eq!(first["order"][3], "dinner");
}

#[then("the command prints one route costing 20")]
fn route_succeeds(#[from(world)] world: &CliWorld) {
    let routes = world.output();
    let routes = routes.as_array().expect("routes array");
    assert_eq!(routes.len(), 1);
    let route = routes.first().expect("a route");
    assert_eq!(route["cost"], 20);
    assert_eq!(route["vertices"], serde_json::json!([1, 6, 5]));
}

#[then("the command prints stations 1 and 4")]
fn nearby_succeeds(#[from(world)] world: &CliWorld) {
    let stations = world.output();
    let ids: Vec<&Value> = stations
        .as_array()
        .expect("stations array")
        .iter()
        .map(|station| &station["id"])
        .collect();
    assert_eq!(ids, [&serde_json::json!(1), &serde_json::json!(4)]);
}

#[then("the command fails because the route index is missing")]
fn plan_fails_without_index(#[from(world)] world: &CliWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingSourceFile { field, .. } => assert_eq!(*field, ARG_INDEX),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/cli.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(build_index_happy_path, "building a route index from the trip store");
register_cli_scenario!(plan_happy_path, "planning a stored trip");
register_cli_scenario!(route_happy_path, "routing between two stations");
register_cli_scenario!(nearby_happy_path, "listing stations near a coordinate");
register_cli_scenario!(plan_missing_index, "rejecting a missing route index");

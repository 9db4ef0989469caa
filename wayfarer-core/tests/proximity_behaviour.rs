//! Behavioural tests for geohash radius queries.

use std::cell::RefCell;

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use wayfarer_core::{GeoIndex, GeoPoint, GeoPointId, GeohashGrid, NearbyError};

type Outcome = Option<Result<Vec<GeoPoint>, NearbyError>>;

fn station(id: u64, name: &str, lon: f64, lat: f64) -> GeoPoint {
    GeoPoint::new(GeoPointId::new(id), Coord { x: lon, y: lat }).with_name(name)
}

#[fixture]
fn index() -> RefCell<GeoIndex> {
    RefCell::new(GeoIndex::default())
}

#[fixture]
fn found() -> RefCell<Outcome> {
    RefCell::new(None)
}

#[given("an index of stations around Tokyo")]
fn given_tokyo(#[from(index)] index: &RefCell<GeoIndex>) {
    *index.borrow_mut() = GeoIndex::from_points(
        GeohashGrid::default(),
        [
            station(1, "Tokyo", 139.7671, 35.6812),
            station(2, "Kanda", 139.7707, 35.6918),
            station(3, "Akihabara", 139.7740, 35.6984),
            station(4, "Yurakucho", 139.7630, 35.6751),
            station(5, "Shimbashi", 139.7583, 35.6664),
            station(6, "Ginza", 139.7640, 35.6717),
        ],
    );
}

#[given("an index with vertices either side of the antimeridian")]
fn given_antimeridian(#[from(index)] index: &RefCell<GeoIndex>) {
    *index.borrow_mut() = GeoIndex::from_points(
        GeohashGrid::default(),
        [
            station(10, "east", 179.99, 0.0),
            station(11, "west", -179.99, 0.0),
            station(12, "far", 170.0, 0.0),
        ],
    );
}

fn search(index: &RefCell<GeoIndex>, found: &RefCell<Outcome>, centre: Coord<f64>, radius: f64) {
    *found.borrow_mut() = Some(index.borrow().nearby(centre, radius));
}

#[when("I search 1500 metres around Tokyo station")]
fn when_search_tokyo(
    #[from(index)] index: &RefCell<GeoIndex>,
    #[from(found)] found: &RefCell<Outcome>,
) {
    search(index, found, Coord { x: 139.7671, y: 35.6812 }, 1_500.0);
}

#[when("I search 1500 metres around a point in Tokyo Bay")]
fn when_search_bay(
    #[from(index)] index: &RefCell<GeoIndex>,
    #[from(found)] found: &RefCell<Outcome>,
) {
    search(index, found, Coord { x: 139.80, y: 35.60 }, 1_500.0);
}

#[when("I search 5000 metres around the antimeridian")]
fn when_search_antimeridian(
    #[from(index)] index: &RefCell<GeoIndex>,
    #[from(found)] found: &RefCell<Outcome>,
) {
    search(index, found, Coord { x: 179.995, y: 0.0 }, 5_000.0);
}

#[when("I search with a negative radius")]
fn when_search_negative(
    #[from(index)] index: &RefCell<GeoIndex>,
    #[from(found)] found: &RefCell<Outcome>,
) {
    search(index, found, Coord { x: 139.7671, y: 35.6812 }, -1.0);
}

fn names(found: &RefCell<Outcome>) -> Vec<String> {
    let found = found.borrow();
    found
        .as_ref()
        .expect("search ran")
        .as_ref()
        .expect("search succeeded")
        .iter()
        .filter_map(|point| point.name.clone())
        .collect()
}

#[then("Tokyo, Yurakucho, Ginza and Kanda are returned in that order")]
fn then_tokyo_stations(#[from(found)] found: &RefCell<Outcome>) {
    assert_eq!(names(found), ["Tokyo", "Yurakucho", "Ginza", "Kanda"]);
}

#[then("no stations are returned")]
fn then_none(#[from(found)] found: &RefCell<Outcome>) {
    assert!(names(found).is_empty(), "expected no stations");
}

#[then("both antimeridian vertices are returned")]
fn then_both_sides(#[from(found)] found: &RefCell<Outcome>) {
    let mut names = names(found);
    names.sort();
    assert_eq!(names, ["east", "west"]);
}

#[then("an invalid radius error is returned")]
fn then_invalid_radius(#[from(found)] found: &RefCell<Outcome>) {
    let found = found.borrow();
    let err = found
        .as_ref()
        .expect("search ran")
        .as_ref()
        .expect_err("negative radius rejected");
    assert!(matches!(err, NearbyError::InvalidRadius { .. }));
}

#[scenario(path = "tests/features/proximity.feature", index = 0)]
fn scenario_tokyo(index: RefCell<GeoIndex>, found: RefCell<Outcome>) {
    let _ = (index, found);
}

#[scenario(path = "tests/features/proximity.feature", index = 1)]
fn scenario_bay(index: RefCell<GeoIndex>, found: RefCell<Outcome>) {
    let _ = (index, found);
}

#[scenario(path = "tests/features/proximity.feature", index = 2)]
fn scenario_antimeridian(index: RefCell<GeoIndex>, found: RefCell<Outcome>) {
    let _ = (index, found);
}

#[scenario(path = "tests/features/proximity.feature", index = 3)]
fn scenario_negative_radius(index: RefCell<GeoIndex>, found: RefCell<Outcome>) {
    let _ = (index, found);
}

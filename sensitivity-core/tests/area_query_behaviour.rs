//! Behavioural tests for area selection using rstest-bdd.

use std::cell::RefCell;

use geo::line_string;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use sensitivity_core::{
    AreaQuery, AreaStore, PracticeFilter, SensitiveArea, Srid,
    test_support::{MemoryStore, sample_species, square},
};

struct QueryWorld {
    store: RefCell<MemoryStore>,
    results: RefCell<Vec<SensitiveArea>>,
}

#[fixture]
fn world() -> QueryWorld {
    QueryWorld {
        store: RefCell::new(MemoryStore::new(Srid::Lambert93)),
        results: RefCell::new(Vec::new()),
    }
}

fn area(id: u64, x: f64, practices: &[&str], published: bool) -> SensitiveArea {
    SensitiveArea::new(
        id,
        sample_species(id, practices),
        square(700_000.0 + x, 6_600_000.0, 100.0),
        Srid::Lambert93,
        1,
    )
    .with_published(published)
}

fn select(world: &QueryWorld, query: &AreaQuery) {
    let results = world.store.borrow().select(query).expect("select areas");
    world.results.replace(results);
}

fn result_ids(world: &QueryWorld) -> Vec<u64> {
    world.results.borrow().iter().map(|area| area.id).collect()
}

#[given("a store with published, draft and deleted areas")]
fn given_store(world: &QueryWorld) {
    let mut deleted = area(4, 600.0, &["Climbing"], true);
    deleted.soft_delete();
    let store = MemoryStore::new(Srid::Lambert93).with_areas([
        area(1, 0.0, &["Climbing"], true),
        area(2, 200.0, &["Hiking", "Flying"], true),
        area(3, 400.0, &["Climbing"], false),
        deleted,
    ]);
    world.store.replace(store);
}

#[when("I select existing areas")]
fn when_existing(world: &QueryWorld) {
    select(world, &AreaQuery::existing());
}

#[when("I select published areas")]
fn when_published(world: &QueryWorld) {
    select(world, &AreaQuery::existing().published());
}

#[when("I select published areas practising climbing or hiking")]
fn when_practising_climbing_or_hiking(world: &QueryWorld) {
    select(
        world,
        &AreaQuery::existing()
            .published()
            .practices(PracticeFilter::parse("Climbing,Hiking")),
    );
}

#[when("I select published areas practising swimming")]
fn when_practising_swimming(world: &QueryWorld) {
    select(
        world,
        &AreaQuery::existing()
            .published()
            .practices(PracticeFilter::parse("Swimming")),
    );
}

#[when("I select published areas in WGS84")]
fn when_published_wgs84(world: &QueryWorld) {
    select(
        world,
        &AreaQuery::existing().published().transform(Srid::Wgs84),
    );
}

#[when("I select the published areas crossed by a trek over area 1")]
fn when_trek_areas(world: &QueryWorld) {
    let path = line_string![
        (x: 699_950.0, y: 6_600_050.0),
        (x: 700_050.0, y: 6_600_050.0)
    ];
    let results = world
        .store
        .borrow()
        .intersecting(&path, Srid::Lambert93, &AreaQuery::existing().published())
        .expect("select crossed areas");
    world.results.replace(results);
}

#[then("areas 1, 2 and 3 are returned")]
fn then_three(world: &QueryWorld) {
    assert_eq!(result_ids(world), vec![1, 2, 3]);
}

#[then("areas 1 and 2 are returned")]
fn then_two(world: &QueryWorld) {
    assert_eq!(result_ids(world), vec![1, 2]);
}

#[then("no areas are returned")]
fn then_none(world: &QueryWorld) {
    assert!(world.results.borrow().is_empty());
}

#[then("every returned area is expressed in WGS84")]
fn then_wgs84(world: &QueryWorld) {
    let results = world.results.borrow();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|area| area.srid == Srid::Wgs84));
}

#[then("only area 1 is returned")]
fn then_only_first(world: &QueryWorld) {
    assert_eq!(result_ids(world), vec![1]);
}

#[scenario(path = "tests/features/area_query.feature", index = 0)]
fn existing_excludes_deleted(world: QueryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/area_query.feature", index = 1)]
fn publication_hides_drafts(world: QueryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/area_query.feature", index = 2)]
fn practices_match_any(world: QueryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/area_query.feature", index = 3)]
fn unknown_practice_matches_nothing(world: QueryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/area_query.feature", index = 4)]
fn public_results_reprojected(world: QueryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/area_query.feature", index = 5)]
fn trek_areas_follow_path(world: QueryWorld) {
    let _ = world;
}

//! Behaviour-driven step definitions driving the listing CLI scenarios.

use super::helpers::{Seeded, Workspace, printed_ids, seed_database};
use super::*;
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

#[derive(Debug)]
struct ListingWorld {
    workspace: Workspace,
    database: Utf8PathBuf,
    seeded: RefCell<Option<Seeded>>,
    include_database: RefCell<bool>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl ListingWorld {
    fn new() -> Self {
        let workspace = Workspace::new();
        let database = workspace.path("areas.db");
        Self {
            workspace,
            database,
            seeded: RefCell::new(None),
            include_database: RefCell::new(true),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn seeded(&self) -> Seeded {
        self.seeded.borrow().expect("store seeded")
    }

    fn build_command_line(&self, subcommand: &str, trek: Option<u64>) -> Vec<String> {
        let mut argv = vec!["sensitivity".to_owned(), subcommand.to_owned()];
        argv.extend(trek.map(|id| id.to_string()));
        if *self.include_database.borrow() {
            argv.extend([format!("--{ARG_DATABASE}"), self.database.as_str().to_owned()]);
        }
        argv
    }

    fn run(&self, subcommand: &str, trek: Option<u64>) {
        let invocation = self.build_command_line(subcommand, trek);
        let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
        let outcome = parsed.and_then(|cli| {
            let mut buffer = self.stdout.borrow_mut();
            match cli.command {
                Command::Areas(args) => listing::run_areas_with(args, &mut *buffer),
                Command::TrekAreas(args) => listing::run_trek_areas_with(args, &mut *buffer),
                Command::SyncRando(_) => panic!("expected a listing command"),
            }
        });
        self.result.replace(Some(outcome));
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> ListingWorld {
    ListingWorld::new()
}

#[given("a seeded area store on disk")]
fn seeded_store(#[from(world)] world: &ListingWorld) {
    let seeded = seed_database(&world.database);
    world.seeded.replace(Some(seeded));
    assert!(world.workspace.path("areas.db").as_std_path().is_file());
}

#[given("I omit the database path")]
fn omit_database(#[from(world)] world: &ListingWorld) {
    *world.include_database.borrow_mut() = false;
}

#[when("I run the areas command")]
fn run_areas(#[from(world)] world: &ListingWorld) {
    world.run("areas", None);
}

#[when("I run the trek-areas command for the public trek")]
fn run_public_trek(#[from(world)] world: &ListingWorld) {
    world.run("trek-areas", Some(world.seeded().public_trek));
}

#[when("I run the trek-areas command for the hidden trek")]
fn run_hidden_trek(#[from(world)] world: &ListingWorld) {
    world.run("trek-areas", Some(world.seeded().hidden_trek));
}

#[then("the command prints both published areas")]
fn prints_published(#[from(world)] world: &ListingWorld) {
    let seeded = world.seeded();
    assert_eq!(
        printed_ids(&world.stdout.borrow()),
        vec![seeded.crossed, seeded.remote]
    );
}

#[then("the command prints the area crossed by the trek")]
fn prints_crossed(#[from(world)] world: &ListingWorld) {
    assert_eq!(printed_ids(&world.stdout.borrow()), vec![world.seeded().crossed]);
}

#[then("the command fails with status 404")]
fn fails_not_found(#[from(world)] world: &ListingWorld) {
    match &*world.error() {
        CliError::Api { source } => assert_eq!(source.status(), 404),
        other => panic!("expected an API error, found {other:?}"),
    }
}

#[then("the command fails because the database path is missing")]
fn fails_missing_database(#[from(world)] world: &ListingWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_DATABASE),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_listing_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/listing_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ListingWorld) {
            let _ = world;
        }
    };
}

register_listing_scenario!(listing_published, "listing published areas");
register_listing_scenario!(listing_public_trek, "listing the areas of a public trek");
register_listing_scenario!(listing_hidden_trek, "hiding unpublished treks");
register_listing_scenario!(listing_missing_database, "rejecting a missing database path");

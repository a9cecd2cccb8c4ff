//! Behaviour-driven step definitions driving the sync-rando CLI scenarios.

use super::helpers::{RecordingBuilder, Workspace, write_utf8};
use super::*;
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use std::cell::RefCell;

const CONFIGURED_URL: &str = "http://portal.example";
const CALLER_URL: &str = "http://caller.example";

#[derive(Debug)]
struct SyncRandoWorld {
    workspace: Workspace,
    builder: RecordingBuilder,
    include_options: RefCell<bool>,
    include_root: RefCell<bool>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl SyncRandoWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            builder: RecordingBuilder::default(),
            include_options: RefCell::new(false),
            include_root: RefCell::new(true),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn options_path(&self) -> Utf8PathBuf {
        self.workspace.path("options.json")
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec![
            "sensitivity".to_owned(),
            "sync-rando".to_owned(),
            format!("--{ARG_EXPORT_PROGRAM}"),
            "geotrek".to_owned(),
            format!("--{ARG_URL}"),
            CALLER_URL.to_owned(),
        ];
        if *self.include_root.borrow() {
            argv.extend([
                format!("--{ARG_SYNC_RANDO_ROOT}"),
                self.workspace.path("rando").as_str().to_owned(),
            ]);
        }
        if *self.include_options.borrow() {
            argv.extend([
                format!("--{ARG_SYNC_RANDO_OPTIONS}"),
                self.options_path().as_str().to_owned(),
            ]);
        }
        argv
    }

    fn exported_url(&self) -> Value {
        let calls = self.builder.command.calls();
        let [call] = calls.as_slice() else {
            panic!("expected one export call, found {calls:?}");
        };
        call.options.get("url").cloned().unwrap_or(Value::Null)
    }
}

#[fixture]
fn world() -> SyncRandoWorld {
    SyncRandoWorld::new()
}

#[given("an export options file setting the portal URL")]
fn options_with_url(#[from(world)] world: &SyncRandoWorld) {
    let payload = json!({ "url": CONFIGURED_URL, "with_signages": true }).to_string();
    write_utf8(&world.options_path(), payload.as_bytes());
    *world.include_options.borrow_mut() = true;
}

#[given("no export options file")]
fn no_options(#[from(world)] world: &SyncRandoWorld) {
    *world.include_options.borrow_mut() = false;
}

#[given("I omit the export root")]
fn omit_root(#[from(world)] world: &SyncRandoWorld) {
    *world.include_root.borrow_mut() = false;
}

#[when("I run the sync-rando command with a caller URL")]
fn run_sync_rando(#[from(world)] world: &SyncRandoWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::SyncRando(args) => {
            let mut buffer = world.stdout.borrow_mut();
            sync_rando::run_sync_rando_with(args, &world.builder, &mut *buffer)
        }
        Command::Areas(_) | Command::TrekAreas(_) => panic!("expected sync-rando command"),
    });
    world.result.replace(Some(outcome));
}

#[then("the export receives the configured portal URL")]
fn receives_configured_url(#[from(world)] world: &SyncRandoWorld) {
    assert_eq!(world.exported_url(), json!(CONFIGURED_URL));
}

#[then("the export receives the caller URL")]
fn receives_caller_url(#[from(world)] world: &SyncRandoWorld) {
    assert_eq!(world.exported_url(), json!(CALLER_URL));
}

#[then("the command prints a successful status")]
fn prints_success(#[from(world)] world: &SyncRandoWorld) {
    let borrowed = world.result.borrow();
    borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    let status: Value = serde_json::from_slice(&world.stdout.borrow()).expect("JSON status");
    assert_eq!(status["state"], "SUCCESS");
    assert_eq!(status["meta"]["current"], 5);
    assert_eq!(status["meta"]["infos"], "Init sync ...");
}

#[then("the command fails because the export root is missing")]
fn fails_missing_root(#[from(world)] world: &SyncRandoWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_SYNC_RANDO_ROOT),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
    assert!(world.builder.command.calls().is_empty());
}

macro_rules! register_sync_rando_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/sync_rando_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: SyncRandoWorld) {
            let _ = world;
        }
    };
}

register_sync_rando_scenario!(export_configured_url, "exporting with the configured portal URL");
register_sync_rando_scenario!(export_caller_url, "exporting with the caller URL");
register_sync_rando_scenario!(export_missing_root, "rejecting a missing export root");

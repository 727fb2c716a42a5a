//! Behavioural tests for the server bootstrap sequence.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::bootstrap::{ArgsConfigLoader, BootstrapError, Server, bootstrap_with};

use super::support::{HealthEvent, RecordingHealthReporter};

struct BootstrapWorld {
    loader: ArgsConfigLoader,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Server, BootstrapError>>,
    _scratch: Option<TempDir>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: ArgsConfigLoader::new(["corrald"]),
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
            _scratch: None,
        }
    }

    fn use_arguments(&mut self, line: &str) {
        let argv = ["corrald"]
            .into_iter()
            .chain(line.split_whitespace())
            .chain(["--log-filter", "off"]);
        self.loader = ArgsConfigLoader::new(argv);
    }

    fn error(&self) -> Option<&BootstrapError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("server arguments {line}")]
fn given_arguments(world: &RefCell<BootstrapWorld>, line: String) {
    world.borrow_mut().use_arguments(line.trim_matches('"'));
}

#[given("a corrupt database snapshot")]
fn given_corrupt_snapshot(world: &RefCell<BootstrapWorld>) {
    let scratch = tempfile::tempdir().expect("temp dir");
    let path = scratch.path().join("corral.json");
    fs::write(&path, b"{ not json").expect("write snapshot");
    let line = format!("4000 file:{} admin", path.display());
    let mut world = world.borrow_mut();
    world.use_arguments(&line);
    world._scratch = Some(scratch);
}

#[when("the server bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    let mut world = world.borrow_mut();
    let outcome = bootstrap_with(&world.loader, world.reporter.clone());
    world.outcome = Some(outcome);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(world.error().is_none(), "bootstrap error: {:?}", world.error());
    let server = world
        .outcome
        .as_ref()
        .and_then(|outcome| outcome.as_ref().ok())
        .expect("server bootstrapped");
    assert_eq!(server.args().port, 4000);
    assert!(server.telemetry().is_some());
    assert!(server.services().is_running());
}

#[then("bootstrap fails with a usage error")]
fn then_usage_error(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let error = world.error().expect("bootstrap should fail");
    assert!(
        matches!(error, BootstrapError::Configuration { .. }),
        "unexpected error: {error:?}"
    );
}

#[then("bootstrap fails with a database error")]
fn then_database_error(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.error(), Some(BootstrapError::Database { .. })),
        "unexpected outcome: {:?}",
        world.error()
    );
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert_eq!(events.first(), Some(&HealthEvent::BootstrapStarting));
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing: {events:?}"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(path = "tests/features/server_bootstrap.feature")]
fn server_bootstrap(world: RefCell<BootstrapWorld>) {
    let _ = world;
}

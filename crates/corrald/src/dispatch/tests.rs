//! Unit tests for the dispatcher and its handlers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use mockall::predicate::{always, eq};
use rstest::{fixture, rstest};

use corral_protocol::{
    CredentialDigest, Credentials, Envelope, Operation, Payload, Record, Sha256Digest,
};

use super::{Dispatcher, SECRET_LENGTH, Services};
use crate::health::StructuredHealthReporter;
use crate::notify::{MockNotifier, NotifyError};
use crate::storage::{Database, MemoryDatabase};

const LOGIN: &str = "alice@example.org";
const SECRET: &str = "Secret_123";

struct Harness {
    dispatcher: Dispatcher,
    database: Arc<MemoryDatabase>,
    peer: SocketAddr,
}

impl Harness {
    fn with_notifier(notifier: MockNotifier) -> Self {
        let database = Arc::new(MemoryDatabase::new());
        let services = Services::new(
            database.clone(),
            Arc::new(notifier),
            Arc::new(Sha256Digest),
            Arc::new(StructuredHealthReporter::new()),
        );
        Self {
            dispatcher: Dispatcher::new(Arc::new(services)),
            database,
            peer: "127.0.0.1:40000".parse().expect("peer address"),
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials::from_secret(LOGIN, SECRET, &Sha256Digest)
    }

    fn register_alice(&self) {
        let credentials = self.credentials();
        self.database
            .register_user(&credentials.login, &credentials.digest)
            .expect("register alice");
    }

    fn send(&self, operation: Operation, body: Payload) -> Option<Envelope> {
        let request = Envelope::authenticated(operation, body, &self.credentials());
        self.dispatcher.handle(&request, self.peer)
    }

    fn records(&self) -> Vec<Record> {
        let credentials = self.credentials();
        let user = self
            .database
            .resolve_user_id(&credentials.login, &credentials.digest)
            .expect("resolve")
            .expect("alice registered");
        self.database.list_records(user).expect("list")
    }
}

#[fixture]
fn harness() -> Harness {
    let harness = Harness::with_notifier(MockNotifier::new());
    harness.register_alice();
    harness
}

#[rstest]
fn show_replies_with_sorted_records(harness: Harness) {
    for (name, size) in [("b", 1.0), ("a", 2.0), ("a", 1.0)] {
        assert!(harness
            .send(Operation::Add, Payload::Record(Record::new(name, size, 0.0, 0.0)))
            .is_none());
    }
    let reply = harness.send(Operation::Show, Payload::None).expect("show reply");
    let names: Vec<_> = reply
        .body()
        .as_records()
        .expect("records body")
        .iter()
        .map(|record| (record.name.clone(), record.size))
        .collect();
    assert_eq!(
        names,
        vec![
            (String::from("a"), 1.0),
            (String::from("a"), 2.0),
            (String::from("b"), 1.0)
        ]
    );
}

#[rstest]
fn info_counts_records(harness: Harness) {
    harness.send(Operation::Add, Payload::Record(Record::new("a", 1.0, 0.0, 0.0)));
    let reply = harness.send(Operation::Info, Payload::None).expect("info reply");
    let summary = reply.body().as_collection_info().expect("info body");
    assert_eq!(summary.count, 1);
    assert!(summary.created_at <= SystemTime::now());
}

#[rstest]
fn unresolved_credentials_are_dropped(harness: Harness) {
    let request = Envelope::authenticated(
        Operation::Add,
        Payload::Record(Record::new("sneaky", 1.0, 0.0, 0.0)),
        &Credentials::new(LOGIN, "wrong"),
    );
    assert!(harness.dispatcher.handle(&request, harness.peer).is_none());
    assert!(harness.records().is_empty());
}

#[rstest]
#[case(Operation::Load)]
#[case(Operation::Save)]
fn operations_without_handlers_are_ignored(harness: Harness, #[case] operation: Operation) {
    assert!(harness.send(operation, Payload::None).is_none());
}

#[rstest]
fn responses_are_never_handled(harness: Harness) {
    let response = Envelope::response(Operation::Login, Payload::Flag(true));
    assert!(harness.dispatcher.handle(&response, harness.peer).is_none());
}

#[rstest]
fn wrong_body_gets_no_reply(harness: Harness) {
    assert!(harness.send(Operation::Add, Payload::Text(String::from("x"))).is_none());
    assert!(harness.records().is_empty());
}

#[rstest]
fn import_adds_every_record(harness: Harness) {
    let document = r#"[{"name":"a","size":1,"position":{"x":0,"y":0}},
                       {"name":"b","size":2,"position":{"x":0,"y":0}}]"#;
    harness.send(Operation::Import, Payload::Text(document.to_owned()));
    assert_eq!(harness.records().len(), 2);
}

#[rstest]
fn remove_first_and_last_take_extremes(harness: Harness) {
    for size in [3.0, 1.0, 2.0, 5.0] {
        harness.send(Operation::Add, Payload::Record(Record::new("r", size, 0.0, 0.0)));
    }
    harness.send(Operation::RemoveFirst, Payload::None);
    harness.send(Operation::RemoveLast, Payload::None);
    let mut sizes: Vec<f64> = harness.records().iter().map(|r| r.size).collect();
    sizes.sort_by(f64::total_cmp);
    assert_eq!(sizes, vec![2.0, 3.0]);
}

#[rstest]
fn stop_clears_the_run_flag(harness: Harness) {
    let services = Arc::clone(harness.dispatcher.services());
    assert!(services.is_running());
    assert!(harness.send(Operation::Stop, Payload::None).is_none());
    assert!(!services.is_running());
}

#[rstest]
#[case(SECRET, true)]
#[case("guess", false)]
fn login_reports_verification(harness: Harness, #[case] secret: &str, #[case] expected: bool) {
    let credentials = Credentials::from_secret(LOGIN, secret, &Sha256Digest);
    let request = Envelope::authenticated(Operation::Login, Payload::None, &credentials);
    let reply = harness
        .dispatcher
        .handle(&request, harness.peer)
        .expect("login reply");
    assert_eq!(reply.body().as_flag(), Some(expected));
}

#[test]
fn register_stores_digest_of_delivered_secret() {
    let delivered = Arc::new(Mutex::new(None::<String>));
    let mut notifier = MockNotifier::new();
    let sink = Arc::clone(&delivered);
    notifier
        .expect_deliver()
        .with(eq("bob@example.org"), always())
        .times(1)
        .returning(move |_, secret| {
            *sink.lock().expect("sink lock") = Some(secret.to_owned());
            Ok(())
        });
    let harness = Harness::with_notifier(notifier);

    let request = Envelope::request(
        Operation::Register,
        Payload::Text(String::from("bob@example.org")),
    );
    let reply = harness
        .dispatcher
        .handle(&request, harness.peer)
        .expect("register reply");
    assert_eq!(reply.body().as_flag(), Some(true));

    let secret = delivered
        .lock()
        .expect("sink lock")
        .clone()
        .expect("secret delivered");
    assert_eq!(secret.len(), SECRET_LENGTH);
    let digest = Sha256Digest.digest(&secret);
    assert!(harness
        .database
        .verify_user("bob@example.org", &digest)
        .expect("verify"));
}

#[test]
fn registering_a_taken_address_is_refused_without_delivery() {
    let mut notifier = MockNotifier::new();
    notifier.expect_deliver().times(0);
    let harness = Harness::with_notifier(notifier);
    harness.register_alice();

    let request = Envelope::request(Operation::Register, Payload::Text(String::from(LOGIN)));
    let reply = harness
        .dispatcher
        .handle(&request, harness.peer)
        .expect("register reply");
    assert_eq!(reply.body().as_flag(), Some(false));

    let credentials = harness.credentials();
    assert!(harness
        .database
        .verify_user(&credentials.login, &credentials.digest)
        .expect("verify"));
}

#[test]
fn failed_delivery_registers_nobody() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_deliver()
        .returning(|address, _| Err(NotifyError::InvalidAddress(address.to_owned())));
    let harness = Harness::with_notifier(notifier);

    let request = Envelope::request(Operation::Register, Payload::Text(String::from("nope")));
    let reply = harness
        .dispatcher
        .handle(&request, harness.peer)
        .expect("register reply");
    assert_eq!(reply.body().as_flag(), Some(false));
    assert!(harness
        .database
        .resolve_user_id("nope", "anything")
        .expect("resolve")
        .is_none());
}

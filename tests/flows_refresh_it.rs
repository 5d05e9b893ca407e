#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use time::macros;
use tracing::{
	Event, Metadata, Subscriber,
	field::{Field, Visit},
	span::{Attributes, Id, Record},
	subscriber::DefaultGuard,
};
// self
use id_token_cache::{
	_preludet::*,
	acquire::HostedLogin,
	auth::{CachedCredential, MAX_TTL, TokenState},
	error::PreconditionError,
	flows::{BrokerSettings, EnsureOutcome, RefreshMode},
	request::AcquisitionRequest,
	store::{
		GET_TOKEN_REQUEST_KEY, ID_TOKEN_CREATED_AT_KEY, ID_TOKEN_KEY, MemoryStore, SharedStore,
		StoreError, snapshot,
	},
};

#[derive(Clone, Default)]
struct MessageLog(Arc<Mutex<Vec<String>>>);
impl MessageLog {
	fn install(&self) -> DefaultGuard {
		tracing::subscriber::set_default(self.clone())
	}

	fn contains(&self, message: &str) -> bool {
		self.0.lock().iter().any(|logged| logged == message)
	}
}
impl Subscriber for MessageLog {
	fn enabled(&self, _: &Metadata<'_>) -> bool {
		true
	}

	fn new_span(&self, _: &Attributes<'_>) -> Id {
		Id::from_u64(1)
	}

	fn record(&self, _: &Id, _: &Record<'_>) {}

	fn record_follows_from(&self, _: &Id, _: &Id) {}

	fn event(&self, event: &Event<'_>) {
		event.record(&mut MessageVisitor(&mut self.0.lock()));
	}

	fn enter(&self, _: &Id) {}

	fn exit(&self, _: &Id) {}
}

struct MessageVisitor<'a>(&'a mut Vec<String>);
impl Visit for MessageVisitor<'_> {
	fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
		if field.name() == "message" {
			self.0.push(format!("{value:?}"));
		}
	}
}

fn settings(mode: RefreshMode) -> BrokerSettings {
	BrokerSettings::default().with_refresh_mode(mode)
}

async fn seed(store: &MemoryStore, token: &str, issued_at: OffsetDateTime, server: &MockServer) {
	let credential = CachedCredential::new(token, issued_at)
		.with_acquisition_request(AcquisitionRequest::get(server.url("/login")));

	snapshot::save_credential(store, &credential, true)
		.await
		.expect("Seeding the store should succeed.");
}

async fn mock_login<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let location = format!("https://app.example.com/cb#id_token={token}&access_token=at");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/login");
			then.status(302).header("location", location);
		})
		.await
}

#[tokio::test]
async fn token_younger_than_the_ttl_is_left_alone() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));

	seed(&store, "id-fresh", OffsetDateTime::now_utc() - Duration::minutes(59), &server).await;

	let mock = mock_login(&server, "id-unused").await;
	let outcome = broker.ensure_valid().await.expect("Validity check should succeed.");

	assert!(matches!(
		&outcome,
		EnsureOutcome::Valid(credential) if credential.token.expose() == "id-fresh"
	));

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn token_older_than_the_ttl_is_refreshed_before_returning() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));
	let issued = OffsetDateTime::now_utc() - Duration::minutes(61);

	seed(&store, "id-stale", issued, &server).await;

	let mock = mock_login(&server, "id-renewed").await;
	let outcome = broker.ensure_valid().await.expect("Stale token should be refreshed.");

	mock.assert_calls_async(1).await;

	let credential = match outcome {
		EnsureOutcome::Refreshed(credential) => credential,
		other => panic!("Unexpected outcome: {other:?}"),
	};

	assert_eq!(credential.token.expose(), "id-renewed");
	assert!(credential.issued_at > issued);
	assert_eq!(store.entries()[ID_TOKEN_KEY], "id-renewed");
	assert_eq!(
		(
			broker.refresh_metrics.attempts(),
			broker.refresh_metrics.successes(),
			broker.refresh_metrics.failures()
		),
		(1, 1, 0)
	);
}

#[tokio::test]
async fn ttl_boundary_is_exclusive() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::CheckOnly));
	let issued = macros::datetime!(2025-06-01 09:00 UTC);

	seed(&store, "id-boundary", issued, &server).await;

	let mock = mock_login(&server, "id-unused").await;

	for offset in [3599, 3600] {
		let outcome = broker
			.ensure_valid_at(issued + Duration::seconds(offset))
			.await
			.expect("Validity check should succeed.");

		assert!(matches!(outcome, EnsureOutcome::Valid(_)), "Age {offset}s should be valid.");
	}

	let outcome = broker
		.ensure_valid_at(issued + Duration::seconds(3601))
		.await
		.expect("Validity check should succeed.");

	match outcome {
		EnsureOutcome::NeedsRefresh { current, state } => {
			assert_eq!(state, TokenState::Stale);
			assert_eq!(
				current.expect("Stale credential should still be reported.").token.expose(),
				"id-boundary"
			);
		},
		other => panic!("Unexpected outcome: {other:?}"),
	}

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn check_only_reports_a_cold_cache_without_requests() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::CheckOnly));
	let mock = mock_login(&server, "id-unused").await;
	let outcome = broker.ensure_valid().await.expect("Validity check should succeed.");

	assert!(matches!(
		outcome,
		EnsureOutcome::NeedsRefresh { current: None, state: TokenState::Absent }
	));
	assert!(broker.pre_request().await.is_none());
	assert!(store.is_empty());

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn background_refresh_returns_before_the_token_is_replaced() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Background));

	seed(&store, "id-old", OffsetDateTime::now_utc() - Duration::hours(3), &server).await;

	let mock = mock_login(&server, "id-background").await;
	let outcome = broker.ensure_valid().await.expect("Scheduling a refresh should succeed.");
	let handle = match outcome {
		EnsureOutcome::RefreshScheduled { current, handle } => {
			assert_eq!(
				current.expect("Stale credential should be reported.").token.expose(),
				"id-old"
			);

			handle
		},
		other => panic!("Unexpected outcome: {other:?}"),
	};

	// The current-thread runtime has not polled the spawned task yet.
	assert_eq!(store.entries()[ID_TOKEN_KEY], "id-old");

	let credential = handle.join().await.expect("Background refresh should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(credential.token.expose(), "id-background");
	assert_eq!(store.entries()[ID_TOKEN_KEY], "id-background");
}

#[tokio::test]
async fn background_refresh_fills_a_cold_cache_without_waiting() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Background));

	snapshot::save_acquisition_request(&*store, &AcquisitionRequest::get(server.url("/login")))
		.await
		.expect("Storing the acquisition request should succeed.");

	let mock = mock_login(&server, "id-first").await;
	let handle = match broker.ensure_valid().await.expect("Scheduling a refresh should succeed.") {
		EnsureOutcome::RefreshScheduled { current: None, handle } => handle,
		other => panic!("Unexpected outcome: {other:?}"),
	};

	assert!(!store.entries().contains_key(ID_TOKEN_KEY));

	let credential = handle.join().await.expect("Background refresh should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(credential.token.expose(), "id-first");
	assert_eq!(store.entries()[ID_TOKEN_KEY], "id-first");
	assert_eq!(broker.refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn awaited_refresh_is_shared_by_concurrent_callers() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));

	seed(&store, "id-stale", OffsetDateTime::now_utc() - Duration::hours(2), &server).await;

	let mock = mock_login(&server, "id-shared").await;
	let (first, second) = tokio::join!(broker.ensure_valid(), broker.ensure_valid());
	let first = first.expect("First caller should get a token.");
	let second = second.expect("Second caller should get a token.");

	mock.assert_calls_async(1).await;

	for outcome in [first, second] {
		assert_eq!(
			outcome.credential().expect("Refreshed outcomes carry a credential.").token.expose(),
			"id-shared"
		);
	}

	assert_eq!(broker.refresh_metrics.attempts(), 2);
	assert_eq!(broker.refresh_metrics.successes(), 2);
}

#[tokio::test]
async fn malformed_stored_request_fails_the_check_but_not_the_hook() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));

	seed(&store, "id-cached", OffsetDateTime::now_utc() - Duration::hours(2), &server).await;
	store
		.set(GET_TOKEN_REQUEST_KEY, "{\"method\":".into())
		.await
		.expect("Corrupting the stored request should succeed.");

	let mock = mock_login(&server, "id-unused").await;
	let err = broker.ensure_valid().await.expect_err("Malformed descriptors must fail.");

	assert!(matches!(err, Error::Storage(StoreError::Serialization { .. })));

	let credential =
		broker.pre_request().await.expect("Pre-request hook should fall back to the cache.");

	assert_eq!(credential.token.expose(), "id-cached");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn failed_refresh_is_counted_and_the_hook_keeps_the_stale_token() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));

	seed(&store, "id-stale", OffsetDateTime::now_utc() - Duration::hours(2), &server).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/login");
			then.status(200).body("<html>session expired</html>");
		})
		.await;
	let credential = broker.pre_request().await.expect("The stale token should be returned.");

	mock.assert_calls_async(1).await;

	assert_eq!(credential.token.expose(), "id-stale");
	assert_eq!(broker.refresh_metrics.failures(), 1);
	assert_eq!(store.entries()[ID_TOKEN_KEY], "id-stale");
}

#[tokio::test]
async fn cold_cache_without_any_request_is_a_precondition_failure() {
	let (broker, _store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::Await));
	let err = broker.ensure_valid().await.expect_err("Nothing describes how to acquire a token.");

	assert!(matches!(err, Error::Precondition(PreconditionError::MissingAcquisitionRequest)));
	assert!(broker.pre_request().await.is_none());
}

#[tokio::test]
async fn valid_token_at_the_end_of_time_is_logged_without_overflow() {
	let log = MessageLog::default();
	let _guard = log.install();
	let (broker, store) =
		build_reqwest_test_broker(HostedLogin::default(), settings(RefreshMode::CheckOnly));

	store.set(ID_TOKEN_KEY, "id-far".into()).await.expect("Storing the token should succeed.");
	store
		.set(ID_TOKEN_CREATED_AT_KEY, "9999-12-31T23:30:00Z".into())
		.await
		.expect("Storing the timestamp should succeed.");

	let credential = broker.pre_request().await.expect("The cached token should be returned.");

	assert_eq!(credential.token.expose(), "id-far");
	assert!(log.contains("Token is still valid."));
}

#[tokio::test]
async fn largest_ttl_keeps_the_check_panic_free() {
	let log = MessageLog::default();
	let _guard = log.install();
	let server = MockServer::start_async().await;
	let (broker, store) = build_reqwest_test_broker(
		HostedLogin::default(),
		settings(RefreshMode::CheckOnly).with_ttl(Duration::MAX),
	);

	assert_eq!(broker.settings.ttl, MAX_TTL);

	seed(&store, "id-long", OffsetDateTime::now_utc() - Duration::days(1), &server).await;

	let credential = broker.pre_request().await.expect("The cached token should be returned.");

	assert_eq!(credential.token.expose(), "id-long");
	assert!(log.contains("Token is still valid."));
}

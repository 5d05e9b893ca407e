//! Demonstrates the hosted-login flow: the host reports its own login response through the
//! post-response hook, and a later background refresh replays the stored request.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use id_token_cache::{
	HttpResponse,
	acquire::HostedLogin,
	auth::CachedCredential,
	flows::{BrokerSettings, EnsureOutcome, RefreshMode, TokenBroker},
	http_types::{HeaderValue, StatusCode, header::LOCATION},
	request::AcquisitionRequest,
	store::{MemoryStore, SharedStore, snapshot},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/login");
			then.status(302).header(
				"location",
				"https://app.example.com/cb#id_token=id-renewed&access_token=at",
			);
		})
		.await;
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn SharedStore> = store_backend.clone();
	let broker = TokenBroker::new(store, HostedLogin::default())?.with_settings(
		BrokerSettings::default().with_refresh_mode(RefreshMode::Background),
	);
	let request = AcquisitionRequest::get(server.url("/login?response_type=token"));
	let mut response = HttpResponse::new(Vec::new());

	*response.status_mut() = StatusCode::FOUND;

	response.headers_mut().insert(
		LOCATION,
		HeaderValue::from_static("https://app.example.com/cb#id_token=id-first&access_token=at"),
	);

	let first = broker.post_response(&request, &response).await?;

	println!("Stored token {} from the host's login response.", first.token.fingerprint());

	let aged = CachedCredential::new("id-first", OffsetDateTime::now_utc() - Duration::hours(2));

	snapshot::save_credential(&*store_backend, &aged, false).await?;

	if let EnsureOutcome::RefreshScheduled { current, handle } = broker.ensure_valid().await? {
		if let Some(current) = current {
			println!("This call still uses token {}.", current.token.fingerprint());
		}

		let renewed = handle.join().await?;

		println!("Later calls use token {}.", renewed.token.fingerprint());
	}

	login_mock.assert_async().await;

	Ok(())
}

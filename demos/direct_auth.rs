//! Demonstrates guarding protected calls with the pre-request hook, using a direct
//! `InitiateAuth` login, the default reqwest transport, and the in-memory store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use id_token_cache::{
	acquire::{DirectAuth, INITIATE_AUTH_TARGET},
	flows::{EnsureOutcome, TokenBroker},
	store::{MemoryStore, SharedStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/").header("x-amz-target", INITIATE_AUTH_TARGET);
			then.status(200).json_body(serde_json::json!({
				"AuthenticationResult": { "IdToken": "demo-id-token", "ExpiresIn": 3600 },
			}));
		})
		.await;
	let auth = DirectAuth::builder(Url::parse(&server.url("/"))?)
		.client_id("demo-client")
		.username("demo-user")
		.password("demo-password")
		.build()?;
	let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::default());
	let broker = TokenBroker::new(store, auth)?;

	match broker.pre_request().await {
		Some(credential) => println!("Attaching token {}.", credential.token.fingerprint()),
		None => println!("No token available; the request goes out unauthenticated."),
	}

	if let EnsureOutcome::Valid(credential) = broker.ensure_valid().await? {
		println!("Cached token {} is reused.", credential.token.fingerprint());
	}

	login_mock.assert_async().await;

	Ok(())
}

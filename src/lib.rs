//! Identity-token cache for request pipelines: acquire a token from a JSON authentication API
//! or a hosted-login redirect, keep it in a shared store, and refresh it before the calls that
//! depend on it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod acquire;
pub mod auth;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod request;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		acquire::AcquisitionMethod,
		flows::{BrokerSettings, ReqwestBroker, TokenBroker},
		http::ReqwestHttpClient,
		store::{MemoryStore, SharedStore},
	};

	/// Builds a reqwest HTTP client that returns redirects as-is, like the production client.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::new().expect("Failed to build Reqwest client for tests.")
	}

	/// Constructs a [`TokenBroker`] backed by an in-memory store and the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_broker(
		method: impl Into<AcquisitionMethod>,
		settings: BrokerSettings,
	) -> (ReqwestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SharedStore> = store_backend.clone();
		let broker = TokenBroker::with_http_client(store, method, test_reqwest_http_client())
			.with_settings(settings);

		(broker, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2::{HttpClientError, HttpRequest, HttpResponse, http as http_types};
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

//! Transport primitives for token acquisition requests.
//!
//! [`TokenHttpClient`] is the broker's only dependency on an HTTP stack. The reqwest-backed
//! [`ReqwestHttpClient`] never follows redirects so hosted-login responses surface their
//! `Location` header to the extraction step instead of being chased.

// std
use std::ops::Deref;
// crates.io
use oauth2::{HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
};

/// Boxed future returned by [`TokenHttpClient::execute`].
pub type HttpFuture<'a, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing acquisition requests.
///
/// Implementations must be `Send + Sync + 'static` so a broker (and any background refresh it
/// spawns) can share them. Non-success statuses are returned as responses, not errors; the
/// acquisition method decides what a response means.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves with the raw response.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] with redirect following disabled.
///
/// A custom client passed to [`with_client`](ReqwestHttpClient::with_client) should disable
/// redirects too, otherwise redirect-based acquisition only ever sees the final page.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that returns redirect responses as-is.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Maps a transport failure onto the crate error taxonomy.
pub(crate) fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(source) => TransportError::Network { source }.into(),
		HttpClientError::Http(source) => ConfigError::HttpRequest(source).into(),
		HttpClientError::Io(source) => TransportError::Io(source).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint { message }.into(),
		other => TransientError::TokenEndpoint { message: other.to_string() }.into(),
	}
}

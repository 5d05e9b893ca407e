//! Crate-level error types shared across acquisition, refresh, hooks, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Shared-store failure, including malformed stored values.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A value the acquisition depends on is missing; the cache is left untouched.
	#[error(transparent)]
	Precondition(#[from] PreconditionError),
	/// Unexpected upstream response.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed (method, header name, or header value).
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Acquisition request URL cannot be parsed.
	#[error("Acquisition request URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL as it was supplied.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Direct authentication settings failed validation.
	#[error(transparent)]
	DirectAuth(#[from] crate::acquire::DirectAuthError),
	/// Background refresh was requested outside a tokio runtime.
	#[error("Background refresh requires a running tokio runtime.")]
	MissingRuntime {
		/// Runtime lookup failure.
		#[source]
		source: tokio::runtime::TryCurrentError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Missing inputs that abort an acquisition before anything is stored.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PreconditionError {
	/// Redirect response did not carry a `Location` header.
	#[error("No Location header found in the login response.")]
	MissingLocation,
	/// The `Location` header did not yield a token.
	#[error("Unable to extract an ID token from the redirect location.")]
	EmptyToken,
	/// Direct response lacked `AuthenticationResult.IdToken`.
	#[error("Token response (status {status}) has no AuthenticationResult.IdToken: {body_preview}")]
	MissingIdToken {
		/// HTTP status of the response.
		status: u16,
		/// Leading slice of the response body for diagnostics.
		body_preview: String,
	},
	/// No stored or configured request describes how to re-acquire the token.
	#[error("No acquisition request is stored or configured.")]
	MissingAcquisitionRequest,
}

/// Unexpected upstream behavior.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// HTTP client failed in a way it could not classify.
	#[error("{message}")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A background refresh task panicked or was cancelled.
	#[error("Background refresh task did not complete.")]
	RefreshTask {
		/// Join failure reported by the runtime.
		#[source]
		source: tokio::task::JoinError,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while requesting a token.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while requesting a token.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

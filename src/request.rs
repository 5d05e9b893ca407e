//! Serializable description of the request that acquires a token.
//!
//! [`AcquisitionRequest`] is what the post-response hook persists under
//! [`GET_TOKEN_REQUEST_KEY`](crate::store::GET_TOKEN_REQUEST_KEY) so later refreshes can replay
//! the exact request (method, URL, ordered headers, raw body) without re-deriving it.

// crates.io
use oauth2::{HttpRequest, http};
// self
use crate::{_prelude::*, error::ConfigError, store::StoreError};

/// Single request header, kept in the order it was supplied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
	/// Header name as supplied.
	pub key: String,
	/// Header value as supplied.
	pub value: String,
}

/// Method, URL, headers, and body of a token acquisition request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
	/// HTTP method (e.g. `POST`).
	pub method: String,
	/// Absolute request URL.
	pub url: String,
	/// Request headers in send order.
	#[serde(default, rename = "header")]
	pub headers: Vec<RequestHeader>,
	/// Raw request body, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
}
impl AcquisitionRequest {
	/// Creates a request without headers or body.
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self { method: method.into(), url: url.into(), headers: Vec::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: impl Into<String>) -> Self {
		Self::new("GET", url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: impl Into<String>) -> Self {
		Self::new("POST", url)
	}

	/// Appends a header.
	pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push(RequestHeader { key: key.into(), value: value.into() });

		self
	}

	/// Sets the raw body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|header| header.key.eq_ignore_ascii_case(name))
			.map(|header| header.value.as_str())
	}

	/// Serializes the descriptor into the string form kept in the shared store.
	pub fn to_json(&self) -> Result<String, StoreError> {
		serde_json::to_string(self).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize acquisition request: {e}"),
		})
	}

	/// Parses the string form kept in the shared store.
	pub fn from_json(raw: &str) -> Result<Self, StoreError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de).map_err(|e| StoreError::Serialization {
			message: format!(
				"Failed to parse stored acquisition request at `{}`: {}",
				e.path(),
				e.inner()
			),
		})
	}

	/// Builds the transport request this descriptor describes.
	///
	/// The URL must be absolute; it is sent exactly as stored, without normalization.
	pub fn to_http_request(&self) -> Result<HttpRequest, ConfigError> {
		Url::parse(&self.url)
			.map_err(|source| ConfigError::InvalidUrl { url: self.url.clone(), source })?;

		let mut builder =
			http::Request::builder().method(self.method.as_str()).uri(self.url.as_str());

		for header in &self.headers {
			builder = builder.header(header.key.as_str(), header.value.as_str());
		}

		let body = self.body.clone().map(String::into_bytes).unwrap_or_default();

		Ok(builder.body(body)?)
	}

	/// Captures a transport request as a descriptor.
	///
	/// Header values that are not valid UTF-8 and non-UTF-8 bodies are converted lossily.
	pub fn from_http_request(request: &HttpRequest) -> Self {
		let headers = request
			.headers()
			.iter()
			.map(|(name, value)| RequestHeader {
				key: name.as_str().to_owned(),
				value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
			})
			.collect();
		let body = (!request.body().is_empty())
			.then(|| String::from_utf8_lossy(request.body()).into_owned());

		Self {
			method: request.method().as_str().to_owned(),
			url: request.uri().to_string(),
			headers,
			body,
		}
	}
}
impl Debug for AcquisitionRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AcquisitionRequest")
			.field("method", &self.method)
			.field("url", &self.url)
			.field("headers", &self.headers.iter().map(|h| h.key.as_str()).collect::<Vec<_>>())
			.field("body_len", &self.body.as_ref().map(String::len))
			.finish()
	}
}

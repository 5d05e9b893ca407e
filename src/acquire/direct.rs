//! Direct acquisition against an `InitiateAuth`-style JSON API.

// std
use std::net::IpAddr;
// crates.io
use oauth2::HttpResponse;
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{PreconditionError, TransientError},
	request::AcquisitionRequest,
};

/// `X-Amz-Target` value selecting the `InitiateAuth` operation.
pub const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
/// Content type expected by the `InitiateAuth` API.
pub const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
/// Auth flow used when none is configured.
pub const DEFAULT_AUTH_FLOW: &str = "USER_PASSWORD_AUTH";

const BODY_PREVIEW_LEN: usize = 200;

/// Errors raised while validating [`DirectAuth`] settings.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DirectAuthError {
	/// A required setting was not provided or is empty.
	#[error("Direct authentication requires a non-empty `{field}`.")]
	MissingField {
		/// Name of the missing setting.
		field: &'static str,
	},
	/// Endpoint is plain HTTP and does not target a loopback host.
	#[error("The authentication endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Credentials and endpoint for direct acquisition.
#[derive(Clone)]
pub struct DirectAuth {
	/// Authentication API endpoint.
	pub endpoint: Url,
	/// Application client identifier.
	pub client_id: String,
	/// Account username.
	pub username: String,
	/// Auth flow name (defaults to [`DEFAULT_AUTH_FLOW`]).
	pub auth_flow: String,
	password: String,
}
impl DirectAuth {
	/// Starts a builder targeting `endpoint`.
	pub fn builder(endpoint: Url) -> DirectAuthBuilder {
		DirectAuthBuilder::new(endpoint)
	}

	/// Builds the `InitiateAuth` request for these credentials.
	pub fn to_request(&self) -> AcquisitionRequest {
		let body = serde_json::json!({
			"AuthFlow": self.auth_flow,
			"ClientId": self.client_id,
			"AuthParameters": {
				"USERNAME": self.username,
				"PASSWORD": self.password,
			},
		});

		AcquisitionRequest::post(self.endpoint.as_str())
			.with_header("Content-Type", AMZ_JSON_CONTENT_TYPE)
			.with_header("X-Amz-Target", INITIATE_AUTH_TARGET)
			.with_body(body.to_string())
	}
}
impl Debug for DirectAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DirectAuth")
			.field("endpoint", &self.endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("username", &self.username)
			.field("auth_flow", &self.auth_flow)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Builder for [`DirectAuth`] values.
#[derive(Clone)]
pub struct DirectAuthBuilder {
	endpoint: Url,
	client_id: Option<String>,
	username: Option<String>,
	password: Option<String>,
	auth_flow: Option<String>,
}
impl DirectAuthBuilder {
	fn new(endpoint: Url) -> Self {
		Self { endpoint, client_id: None, username: None, password: None, auth_flow: None }
	}

	/// Sets the application client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the account username.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the account password.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());

		self
	}

	/// Overrides the auth flow name.
	pub fn auth_flow(mut self, auth_flow: impl Into<String>) -> Self {
		self.auth_flow = Some(auth_flow.into());

		self
	}

	/// Consumes the builder and validates the resulting settings.
	pub fn build(self) -> Result<DirectAuth, DirectAuthError> {
		validate_endpoint(&self.endpoint)?;

		Ok(DirectAuth {
			endpoint: self.endpoint,
			client_id: required("client_id", self.client_id)?,
			username: required("username", self.username)?,
			password: required("password", self.password)?,
			auth_flow: self
				.auth_flow
				.filter(|flow| !flow.is_empty())
				.unwrap_or_else(|| DEFAULT_AUTH_FLOW.into()),
		})
	}
}
impl Debug for DirectAuthBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DirectAuthBuilder")
			.field("endpoint", &self.endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("username", &self.username)
			.field("password_set", &self.password.is_some())
			.field("auth_flow", &self.auth_flow)
			.finish()
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
	#[serde(default)]
	authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
	#[serde(default)]
	id_token: Option<String>,
}

/// Reads `AuthenticationResult.IdToken` from a direct acquisition response.
///
/// A body that is not JSON is a [`TransientError::TokenResponseParse`]. A JSON body without a
/// non-empty token (including error payloads) is a [`PreconditionError::MissingIdToken`].
pub fn extract_id_token(response: &HttpResponse) -> Result<TokenSecret> {
	let status = response.status().as_u16();
	let mut de = serde_json::Deserializer::from_slice(response.body());
	let parsed: InitiateAuthResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TransientError::TokenResponseParse { source, status: Some(status) })?;

	parsed
		.authentication_result
		.and_then(|result| result.id_token)
		.filter(|token| !token.is_empty())
		.map(TokenSecret::new)
		.ok_or_else(|| {
			let body_preview = body_preview(response.body());

			PreconditionError::MissingIdToken { status, body_preview }.into()
		})
}

fn body_preview(body: &[u8]) -> String {
	String::from_utf8_lossy(body).chars().take(BODY_PREVIEW_LEN).collect()
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DirectAuthError> {
	value.filter(|v| !v.is_empty()).ok_or(DirectAuthError::MissingField { field })
}

fn validate_endpoint(url: &Url) -> Result<(), DirectAuthError> {
	let loopback = match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	};

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(DirectAuthError::InsecureEndpoint { url: url.to_string() }),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	fn response(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}

	#[test]
	fn request_matches_the_initiate_auth_contract() {
		let endpoint = Url::parse("https://cognito-idp.eu-west-1.amazonaws.com/")
			.expect("Endpoint should parse.");
		let auth = DirectAuth::builder(endpoint)
		.client_id("client-123")
		.username("alice")
		.password("hunter2")
		.build()
		.expect("Direct auth should build.");
		let request = auth.to_request();
		let body: serde_json::Value = serde_json::from_str(
			request.body.as_deref().expect("Direct requests always carry a body."),
		)
		.expect("Body should be JSON.");

		assert_eq!(request.method, "POST");
		assert_eq!(request.header("x-amz-target"), Some(INITIATE_AUTH_TARGET));
		assert_eq!(request.header("content-type"), Some(AMZ_JSON_CONTENT_TYPE));
		assert_eq!(body["AuthFlow"], DEFAULT_AUTH_FLOW);
		assert_eq!(body["ClientId"], "client-123");
		assert_eq!(body["AuthParameters"]["USERNAME"], "alice");
		assert_eq!(body["AuthParameters"]["PASSWORD"], "hunter2");
		assert!(!format!("{auth:?}").contains("hunter2"));
	}

	#[test]
	fn id_token_is_read_from_the_nested_field() {
		let token = extract_id_token(&response(
			StatusCode::OK,
			r#"{"AuthenticationResult":{"IdToken":"eyJ.abc.def","AccessToken":"x"}}"#,
		))
		.expect("Token should be extracted.");

		assert_eq!(token.expose(), "eyJ.abc.def");
	}

	#[test]
	fn missing_id_token_is_a_precondition_failure() {
		let err = extract_id_token(&response(
			StatusCode::BAD_REQUEST,
			r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#,
		))
		.expect_err("Error payloads carry no token.");

		match err {
			Error::Precondition(PreconditionError::MissingIdToken { status, body_preview }) => {
				assert_eq!(status, 400);
				assert!(body_preview.contains("NotAuthorizedException"));
			},
			other => panic!("Unexpected error: {other:?}"),
		}

		let err = extract_id_token(&response(
			StatusCode::OK,
			r#"{"AuthenticationResult":{"IdToken":""}}"#,
		))
		.expect_err("Empty tokens must be rejected.");

		assert!(matches!(err, Error::Precondition(PreconditionError::MissingIdToken { .. })));
	}

	#[test]
	fn non_json_body_is_a_parse_failure() {
		let err = extract_id_token(&response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"))
			.expect_err("HTML bodies must be rejected.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenResponseParse { status: Some(502), .. })
		));
	}

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse.")
	}

	#[test]
	fn builder_validates_fields_and_scheme() {
		let insecure = DirectAuth::builder(url("http://auth.example.com/"))
			.client_id("c")
			.username("u")
			.password("p")
			.build();

		assert!(matches!(insecure, Err(DirectAuthError::InsecureEndpoint { .. })));

		let missing = DirectAuth::builder(url("https://auth.example.com/"))
			.client_id("c")
			.password("p")
			.build();

		assert_eq!(missing.err(), Some(DirectAuthError::MissingField { field: "username" }));

		let loopback = DirectAuth::builder(url("http://127.0.0.1:8080/"))
			.client_id("c")
			.username("u")
			.password("p")
			.auth_flow("")
			.build()
			.expect("Loopback HTTP endpoints are allowed.");

		assert_eq!(loopback.auth_flow, DEFAULT_AUTH_FLOW);
	}
}

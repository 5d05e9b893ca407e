//! Redirect-based acquisition: the token travels in the `Location` header of a hosted login
//! redirect.

// crates.io
use oauth2::{HttpResponse, http::header::LOCATION};
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::TokenSecret, error::PreconditionError, request::AcquisitionRequest};

/// Marker preceding the token in a redirect location.
pub const ID_TOKEN_MARKER: &str = "id_token=";
/// Marker that ends the token under positional extraction.
pub const ACCESS_TOKEN_MARKER: &str = "&access_token";

/// How the token is read out of a `Location` value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationExtraction {
	/// Text between `id_token=` and `&access_token`, with no decoding or validation.
	Positional,
	/// `id_token` parameter of the URL fragment (then query), URL-decoded, in any position.
	#[default]
	Fragment,
}
impl LocationExtraction {
	/// Extracts the token from `location`, returning an empty string when nothing matches.
	pub fn extract(self, location: &str) -> String {
		match self {
			Self::Positional => extract_positional(location),
			Self::Fragment => extract_fragment(location).unwrap_or_default(),
		}
	}
}

/// Substring from `id_token=` + 9 to `&access_token`.
///
/// Mirrors string `substring` semantics: a missing marker counts as index `-1`, both bounds are
/// clamped to the value, and they are swapped when the start lies past the end. A location
/// without `&access_token` therefore yields everything up to and including `id_token=`.
pub fn extract_positional(location: &str) -> String {
	let len = location.len();
	// A missing start marker behaves like index -1, hence 9 - 1.
	let start = location
		.find(ID_TOKEN_MARKER)
		.map_or(ID_TOKEN_MARKER.len() - 1, |idx| idx + ID_TOKEN_MARKER.len())
		.min(len);
	let end = location.find(ACCESS_TOKEN_MARKER).unwrap_or(0).min(len);
	let (from, to) = if start > end { (end, start) } else { (start, end) };

	location.get(from..to).unwrap_or_default().to_owned()
}

/// First non-empty `id_token` parameter of the fragment, falling back to the query.
pub fn extract_fragment(location: &str) -> Option<String> {
	let (rest, fragment) = match location.split_once('#') {
		Some((rest, fragment)) => (rest, Some(fragment)),
		None => (location, None),
	};
	let query = rest.split_once('?').map(|(_, query)| query);

	fragment.into_iter().chain(query).find_map(|part| {
		form_urlencoded::parse(part.as_bytes())
			.find(|(key, value)| key == "id_token" && !value.is_empty())
			.map(|(_, value)| value.into_owned())
	})
}

/// Hosted login endpoint answering with a token-bearing redirect.
#[derive(Clone, Debug, Default)]
pub struct HostedLogin {
	/// Seed request used when the store holds no acquisition request yet.
	pub request: Option<AcquisitionRequest>,
	/// Extraction rule applied to the `Location` header.
	pub extraction: LocationExtraction,
}
impl HostedLogin {
	/// Creates a hosted login method with the given extraction rule.
	pub fn new(extraction: LocationExtraction) -> Self {
		Self { request: None, extraction }
	}

	/// Sets the seed request.
	pub fn with_request(mut self, request: AcquisitionRequest) -> Self {
		self.request = Some(request);

		self
	}

	/// Reads the token from the response's `Location` header.
	pub fn extract(&self, response: &HttpResponse) -> Result<TokenSecret> {
		let location = response
			.headers()
			.get(LOCATION)
			.map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
			.ok_or(PreconditionError::MissingLocation)?;
		let token = self.extraction.extract(&location);

		if token.is_empty() {
			return Err(PreconditionError::EmptyToken.into());
		}

		Ok(TokenSecret::new(token))
	}
}

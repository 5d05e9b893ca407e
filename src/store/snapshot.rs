//! Typed view over the three well-known store keys.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{CachedCredential, TokenSecret, TokenState},
	request::AcquisitionRequest,
	store::{
		GET_TOKEN_REQUEST_KEY, ID_TOKEN_CREATED_AT_KEY, ID_TOKEN_KEY, SharedStore, StoreError,
	},
};

/// Everything the cache holds, read in a single store batch.
#[derive(Clone, Debug, Default)]
pub struct CacheSnapshot {
	/// Cached identity token, if any.
	pub token: Option<TokenSecret>,
	/// Instant the cached token was obtained, if recorded.
	pub issued_at: Option<OffsetDateTime>,
	/// Stored acquisition request descriptor, if any.
	pub acquisition_request: Option<AcquisitionRequest>,
}
impl CacheSnapshot {
	/// Reads token, timestamp, and acquisition request in one batch.
	///
	/// Empty strings are treated as absent. A timestamp or descriptor that cannot be parsed is
	/// reported as [`StoreError::Serialization`].
	pub async fn load(store: &dyn SharedStore) -> Result<Self, StoreError> {
		let keys = [ID_TOKEN_KEY, ID_TOKEN_CREATED_AT_KEY, GET_TOKEN_REQUEST_KEY];
		let mut values = store.get_many(&keys).await?.into_iter();
		let token = non_empty(values.next().flatten());
		let issued_at = non_empty(values.next().flatten());
		let request = non_empty(values.next().flatten());

		Ok(Self {
			token: token.map(TokenSecret::new),
			issued_at: issued_at.as_deref().map(parse_issued_at).transpose()?,
			acquisition_request: request.as_deref().map(AcquisitionRequest::from_json).transpose()?,
		})
	}

	/// Reads only the token and timestamp, ignoring the stored descriptor.
	pub async fn load_credential(
		store: &dyn SharedStore,
	) -> Result<Option<CachedCredential>, StoreError> {
		let keys = [ID_TOKEN_KEY, ID_TOKEN_CREATED_AT_KEY];
		let mut values = store.get_many(&keys).await?.into_iter();
		let token = non_empty(values.next().flatten());
		let issued_at = non_empty(values.next().flatten());

		match (token, issued_at) {
			(Some(token), Some(issued_at)) =>
				Ok(Some(CachedCredential::new(token, parse_issued_at(&issued_at)?))),
			_ => Ok(None),
		}
	}

	/// Returns the cached credential when both token and timestamp are present.
	pub fn credential(&self) -> Option<CachedCredential> {
		let (token, issued_at) = (self.token.as_ref()?, self.issued_at?);

		Some(CachedCredential {
			token: token.clone(),
			issued_at,
			acquisition_request: self.acquisition_request.clone(),
		})
	}

	/// Lifecycle state of the cached credential at `now`.
	pub fn state_at(&self, now: OffsetDateTime, ttl: Duration) -> TokenState {
		TokenState::of(self.credential().as_ref(), now, ttl)
	}
}

/// Writes token and timestamp (and optionally the descriptor) in one batch.
pub async fn save_credential(
	store: &dyn SharedStore,
	credential: &CachedCredential,
	include_request: bool,
) -> Result<(), StoreError> {
	let mut entries = vec![
		(ID_TOKEN_KEY.to_owned(), credential.token.expose().to_owned()),
		(ID_TOKEN_CREATED_AT_KEY.to_owned(), format_issued_at(credential.issued_at)?),
	];

	if let Some(request) = credential.acquisition_request.as_ref().filter(|_| include_request) {
		entries.push((GET_TOKEN_REQUEST_KEY.to_owned(), request.to_json()?));
	}

	store.set_many(entries).await
}

/// Persists the acquisition request descriptor on its own.
pub async fn save_acquisition_request(
	store: &dyn SharedStore,
	request: &AcquisitionRequest,
) -> Result<(), StoreError> {
	store.set(GET_TOKEN_REQUEST_KEY, request.to_json()?).await
}

/// Returns `true` when a non-empty descriptor is stored, without parsing it.
pub async fn has_acquisition_request(store: &dyn SharedStore) -> Result<bool, StoreError> {
	Ok(non_empty(store.get(GET_TOKEN_REQUEST_KEY).await?).is_some())
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}

fn parse_issued_at(raw: &str) -> Result<OffsetDateTime, StoreError> {
	OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| StoreError::Serialization {
		message: format!(
			"Stored `{ID_TOKEN_CREATED_AT_KEY}` value is not an RFC 3339 timestamp: {e}"
		),
	})
}

fn format_issued_at(issued_at: OffsetDateTime) -> Result<String, StoreError> {
	issued_at.format(&Rfc3339).map_err(|e| StoreError::Serialization {
		message: format!("Failed to format `{ID_TOKEN_CREATED_AT_KEY}`: {e}"),
	})
}

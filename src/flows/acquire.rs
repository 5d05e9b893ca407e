//! Token acquisition through the broker's configured method.

// crates.io
use oauth2::HttpResponse;
// self
use crate::{
	_prelude::*,
	auth::CachedCredential,
	error::PreconditionError,
	flows::TokenBroker,
	http::{self, TokenHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::AcquisitionRequest,
	store::{CacheSnapshot, snapshot},
};

impl<C> TokenBroker<C>
where
	C: TokenHttpClient,
{
	/// Obtains a fresh token and stores it with the current time.
	///
	/// The request sent is `request` when given, else the stored acquisition request, else the
	/// request configured on the method. On success the token and timestamp replace any
	/// previous values in one store batch; the request is persisted too when the store did not
	/// hold one yet. On failure the store is left untouched.
	pub async fn acquire(&self, request: Option<AcquisitionRequest>) -> Result<CachedCredential> {
		const KIND: FlowKind = FlowKind::Acquire;

		let span = FlowSpan::new(KIND, "acquire");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.acquire_inner(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				tracing::error!(error = %e, "Failed to get a new token.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn acquire_inner(&self, request: Option<AcquisitionRequest>) -> Result<CachedCredential> {
		tracing::info!(method = %self.method.kind(), "Getting a new token...");

		let request = match request {
			Some(request) => request,
			None => self.resolve_request().await?,
		};
		let persist_request = !snapshot::has_acquisition_request(self.store.as_ref()).await?;
		let response = self
			.http_client
			.execute(request.to_http_request()?)
			.await
			.map_err(http::map_transport_error)?;

		self.store_from_response(request, &response, persist_request).await
	}

	async fn resolve_request(&self) -> Result<AcquisitionRequest> {
		let stored = CacheSnapshot::load(self.store.as_ref()).await?.acquisition_request;

		stored
			.or_else(|| self.method.configured_request())
			.ok_or_else(|| PreconditionError::MissingAcquisitionRequest.into())
	}

	/// Extracts the token from `response` and writes it with the current time.
	pub(crate) async fn store_from_response(
		&self,
		request: AcquisitionRequest,
		response: &HttpResponse,
		persist_request: bool,
	) -> Result<CachedCredential> {
		let token = self.method.extract(response)?;
		let credential = CachedCredential {
			token,
			issued_at: OffsetDateTime::now_utc(),
			acquisition_request: Some(request),
		};

		snapshot::save_credential(self.store.as_ref(), &credential, persist_request).await?;

		tracing::info!(
			fingerprint = %credential.token.fingerprint(),
			status = response.status().as_u16(),
			"New ID token saved."
		);

		Ok(credential)
	}
}

//! Entry points a request pipeline calls around its own requests.

// crates.io
use oauth2::{HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	auth::CachedCredential,
	flows::TokenBroker,
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::AcquisitionRequest,
	store::{CacheSnapshot, snapshot},
};

impl<C> TokenBroker<C>
where
	C: TokenHttpClient,
{
	/// Post-response hook for the acquisition request the host just executed.
	///
	/// Persists `request` as the acquisition request (even when extraction then fails), reads
	/// the token out of `response` with the configured method, and stores it with the current
	/// time. Failures are logged and returned; the token and timestamp are left untouched.
	pub async fn post_response(
		&self,
		request: &AcquisitionRequest,
		response: &HttpResponse,
	) -> Result<CachedCredential> {
		const KIND: FlowKind = FlowKind::PostResponse;

		let span = FlowSpan::new(KIND, "post_response");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				tracing::info!(method = %self.method.kind(), "Getting a new token...");

				snapshot::save_acquisition_request(self.store.as_ref(), request).await?;

				self.store_from_response(request.clone(), response, false).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				tracing::error!(error = %e, "Error while extracting the token.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// [`post_response`](Self::post_response) for a request in transport form.
	pub async fn post_response_http(
		&self,
		request: &HttpRequest,
		response: &HttpResponse,
	) -> Result<CachedCredential> {
		self.post_response(&AcquisitionRequest::from_http_request(request), response).await
	}

	/// Pre-request hook guarding a dependent request.
	///
	/// Runs [`ensure_valid`](Self::ensure_valid) and returns the credential to attach. Errors
	/// never propagate: they are logged and the credential currently cached (if readable) is
	/// returned so the dependent request proceeds.
	pub async fn pre_request(&self) -> Option<CachedCredential> {
		const KIND: FlowKind = FlowKind::PreRequest;

		let span = FlowSpan::new(KIND, "pre_request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		span.instrument(async move {
			tracing::info!("Checking token validity...");

			match self.ensure_valid().await {
				Ok(outcome) => {
					obs::record_flow_outcome(KIND, FlowOutcome::Success);

					outcome.into_credential()
				},
				Err(e) => {
					tracing::error!(error = %e, "Pre-request hook error.");
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					self.cached_credential().await
				},
			}
		})
		.await
	}

	async fn cached_credential(&self) -> Option<CachedCredential> {
		CacheSnapshot::load_credential(self.store.as_ref())
			.await
			.inspect_err(|e| tracing::error!(error = %e, "Cached token is unreadable."))
			.ok()
			.flatten()
	}
}

//! Validity checks and refresh orchestration.
//!
//! [`TokenBroker::ensure_valid`] reads the cache in one batch, classifies it as absent, valid,
//! or stale against the configured TTL, and reacts according to [`RefreshMode`]:
//! `CheckOnly` only reports, `Background` spawns the acquisition and returns at once, and
//! `Await` acquires behind a single in-flight guard so concurrent callers share one refresh.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::{CachedCredential, TokenState},
	error::{ConfigError, TransientError},
	flows::{RefreshMode, TokenBroker},
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::AcquisitionRequest,
	store::CacheSnapshot,
};

/// Result of [`TokenBroker::ensure_valid`].
#[derive(Debug)]
pub enum EnsureOutcome {
	/// The cached token is within its TTL; nothing was done.
	Valid(CachedCredential),
	/// A new token was acquired (or reused from a refresh that finished meanwhile).
	Refreshed(CachedCredential),
	/// A background acquisition was started.
	RefreshScheduled {
		/// Credential cached when the refresh was scheduled, if any.
		current: Option<CachedCredential>,
		/// Handle to the spawned acquisition.
		handle: RefreshHandle,
	},
	/// The token is absent or stale and the broker only checks.
	NeedsRefresh {
		/// Credential cached at decision time, if any.
		current: Option<CachedCredential>,
		/// Observed state.
		state: TokenState,
	},
}
impl EnsureOutcome {
	/// Credential usable right now, if any.
	pub fn credential(&self) -> Option<&CachedCredential> {
		match self {
			Self::Valid(credential) | Self::Refreshed(credential) => Some(credential),
			Self::RefreshScheduled { current, .. } | Self::NeedsRefresh { current, .. } =>
				current.as_ref(),
		}
	}

	/// Consumes the outcome and returns the credential usable right now, if any.
	pub fn into_credential(self) -> Option<CachedCredential> {
		match self {
			Self::Valid(credential) | Self::Refreshed(credential) => Some(credential),
			Self::RefreshScheduled { current, .. } | Self::NeedsRefresh { current, .. } => current,
		}
	}
}

/// Handle to a background acquisition.
#[derive(Debug)]
pub struct RefreshHandle(JoinHandle<Result<CachedCredential>>);
impl RefreshHandle {
	/// Waits for the acquisition to finish.
	pub async fn join(self) -> Result<CachedCredential> {
		match self.0.await {
			Ok(result) => result,
			Err(source) => Err(TransientError::RefreshTask { source }.into()),
		}
	}

	/// Returns `true` once the acquisition has completed.
	pub fn is_finished(&self) -> bool {
		self.0.is_finished()
	}
}

impl<C> TokenBroker<C>
where
	C: TokenHttpClient,
{
	/// Makes sure a usable token is cached, refreshing it according to the refresh mode.
	pub async fn ensure_valid(&self) -> Result<EnsureOutcome> {
		self.ensure_valid_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`ensure_valid`](Self::ensure_valid) with an explicit clock reading.
	pub async fn ensure_valid_at(&self, now: OffsetDateTime) -> Result<EnsureOutcome> {
		const KIND: FlowKind = FlowKind::EnsureValid;

		let span = FlowSpan::new(KIND, "ensure_valid");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.ensure_valid_inner(now)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn ensure_valid_inner(&self, now: OffsetDateTime) -> Result<EnsureOutcome> {
		let ttl = self.settings.ttl;
		let snapshot = CacheSnapshot::load(self.store.as_ref()).await?;
		let current = snapshot.credential();
		let state = match &current {
			Some(credential) if credential.state_at(now, ttl) == TokenState::Valid => {
				tracing::info!(
					fingerprint = %credential.token.fingerprint(),
					age_seconds = credential.age_at(now).whole_seconds(),
					"Token is still valid."
				);

				return Ok(EnsureOutcome::Valid(credential.clone()));
			},
			Some(credential) => {
				tracing::info!(
					age_seconds = credential.age_at(now).whole_seconds(),
					"Token expired, refreshing..."
				);

				TokenState::Stale
			},
			None => {
				tracing::warn!("No existing token found, retrieving a new one.");

				TokenState::Absent
			},
		};

		match self.settings.refresh_mode {
			RefreshMode::CheckOnly => {
				tracing::info!(%state, "Refresh needed; the broker only checks validity.");

				Ok(EnsureOutcome::NeedsRefresh { current, state })
			},
			RefreshMode::Background => {
				let handle = self.spawn_refresh(snapshot.acquisition_request)?;

				Ok(EnsureOutcome::RefreshScheduled { current, handle })
			},
			RefreshMode::Await => self
				.refresh_awaited(current, snapshot.acquisition_request)
				.await
				.map(EnsureOutcome::Refreshed),
		}
	}

	fn spawn_refresh(&self, request: Option<AcquisitionRequest>) -> Result<RefreshHandle> {
		let runtime =
			Handle::try_current().map_err(|source| ConfigError::MissingRuntime { source })?;
		let broker = self.clone();

		broker.refresh_metrics.record_attempt();

		let handle = runtime.spawn(async move {
			let result = broker.acquire(request).await;

			broker.refresh_metrics.record_outcome(&result);

			result
		});

		Ok(RefreshHandle(handle))
	}

	async fn refresh_awaited(
		&self,
		observed: Option<CachedCredential>,
		request: Option<AcquisitionRequest>,
	) -> Result<CachedCredential> {
		self.refresh_metrics.record_attempt();

		let _singleflight = self.flow_guard.lock().await;
		let result = self.refresh_locked(observed, request).await;

		self.refresh_metrics.record_outcome(&result);

		result
	}

	async fn refresh_locked(
		&self,
		observed: Option<CachedCredential>,
		request: Option<AcquisitionRequest>,
	) -> Result<CachedCredential> {
		let latest = CacheSnapshot::load(self.store.as_ref()).await?;

		if let Some(credential) = latest.credential() {
			let replaced = observed.is_none_or(|observed| !observed.same_issue(&credential));

			if replaced && !credential.is_stale(self.settings.ttl) {
				tracing::info!(
					fingerprint = %credential.token.fingerprint(),
					"Token was refreshed by a concurrent caller."
				);

				return Ok(credential);
			}
		}

		self.acquire(latest.acquisition_request.or(request)).await
	}
}

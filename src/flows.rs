//! Token cache orchestration: acquisition, validity checks, refresh, and request hooks.

pub mod common;
pub mod refresh;

mod acquire;
mod hooks;

pub use common::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	acquire::AcquisitionMethod,
	http::TokenHttpClient,
	store::{CacheSnapshot, SharedStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = TokenBroker<ReqwestHttpClient>;

/// Manages the single cached identity token for one acquisition method.
///
/// The broker owns the HTTP client, the shared store, and the acquisition method so hooks can
/// be invoked from any task. Cloning is cheap; clones share the store, refresh counters, and
/// the in-flight refresh guard.
pub struct TokenBroker<C>
where
	C: TokenHttpClient,
{
	/// HTTP client used for every acquisition request.
	pub http_client: Arc<C>,
	/// Shared store holding the token, its timestamp, and the acquisition request.
	pub store: Arc<dyn SharedStore>,
	/// How tokens are requested and extracted.
	pub method: AcquisitionMethod,
	/// TTL and refresh behavior.
	pub settings: BrokerSettings,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	flow_guard: Arc<AsyncMutex<()>>,
}
impl<C> TokenBroker<C>
where
	C: TokenHttpClient,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn SharedStore>,
		method: impl Into<AcquisitionMethod>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			method: method.into(),
			settings: BrokerSettings::default(),
			refresh_metrics: Default::default(),
			flow_guard: Default::default(),
		}
	}

	/// Replaces the broker settings.
	pub fn with_settings(mut self, settings: BrokerSettings) -> Self {
		self.settings = settings;

		self
	}

	/// Reads the current cache contents.
	pub async fn snapshot(&self) -> Result<CacheSnapshot> {
		Ok(CacheSnapshot::load(self.store.as_ref()).await?)
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient> {
	/// Creates a broker with its own reqwest transport (redirects disabled).
	pub fn new(store: Arc<dyn SharedStore>, method: impl Into<AcquisitionMethod>) -> Result<Self> {
		Ok(Self::with_http_client(store, method, ReqwestHttpClient::new()?))
	}
}
impl<C> Clone for TokenBroker<C>
where
	C: TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			method: self.method.clone(),
			settings: self.settings,
			refresh_metrics: self.refresh_metrics.clone(),
			flow_guard: self.flow_guard.clone(),
		}
	}
}
impl<C> Debug for TokenBroker<C>
where
	C: TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("method", &self.method)
			.field("settings", &self.settings)
			.finish()
	}
}

//! Shared key-value store contract, the built-in in-memory store, and the typed credential
//! view over the well-known keys.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::CacheSnapshot;

// self
use crate::_prelude::*;

/// Key holding the raw identity token.
pub const ID_TOKEN_KEY: &str = "id_token";
/// Key holding the RFC 3339 instant the token was obtained.
pub const ID_TOKEN_CREATED_AT_KEY: &str = "id_token_created_at";
/// Key holding the JSON acquisition request descriptor.
pub const GET_TOKEN_REQUEST_KEY: &str = "get_token_request";

/// Boxed future returned by [`SharedStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Session-wide store of named strings shared by every hook invocation.
///
/// Batch operations must be atomic with respect to each other: a reader calling
/// [`get_many`](SharedStore::get_many) never observes half of a
/// [`set_many`](SharedStore::set_many) batch.
pub trait SharedStore
where
	Self: Send + Sync,
{
	/// Reads the named values in one consistent view, in key order.
	fn get_many<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>>;

	/// Writes every entry in one batch, replacing existing values.
	fn set_many(&self, entries: Vec<(String, String)>) -> StoreFuture<'_, ()>;

	/// Reads a single named value.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let keys = [key];

			Ok(self.get_many(&keys).await?.pop().flatten())
		})
	}

	/// Writes a single named value.
	fn set(&self, key: &str, value: String) -> StoreFuture<'_, ()> {
		self.set_many(vec![(key.to_owned(), value)])
	}
}

/// Error type produced by [`SharedStore`] implementations and the typed view over them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A stored value could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

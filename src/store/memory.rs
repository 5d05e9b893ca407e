//! Thread-safe in-memory [`SharedStore`] implementation, the session-lifetime default.

// self
use crate::{
	_prelude::*,
	store::{SharedStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, String>>>;

/// Thread-safe storage backend that keeps values in-process for the life of the session.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a sorted copy of every stored entry.
	pub fn entries(&self) -> BTreeMap<String, String> {
		self.0.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	/// Returns `true` when nothing has been stored yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_many_now(map: StoreMap, keys: &[&str]) -> Vec<Option<String>> {
		let guard = map.read();

		keys.iter().map(|key| guard.get(*key).cloned()).collect()
	}

	fn set_many_now(map: StoreMap, entries: Vec<(String, String)>) -> Result<(), StoreError> {
		let mut guard = map.write();

		for (key, value) in entries {
			guard.insert(key, value);
		}

		Ok(())
	}
}
impl SharedStore for MemoryStore {
	fn get_many<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, Vec<Option<String>>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_many_now(map, keys)) })
	}

	fn set_many(&self, entries: Vec<(String, String)>) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_many_now(map, entries) })
	}
}

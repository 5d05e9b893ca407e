//! Broker settings shared by every flow.

// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_TTL, MAX_TTL},
};

/// What [`ensure_valid`](crate::flows::TokenBroker::ensure_valid) does with an absent or stale
/// token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
	/// Report the state and never acquire.
	CheckOnly,
	/// Start the acquisition on the runtime and return at once.
	Background,
	/// Acquire before returning, one refresh at a time.
	#[default]
	Await,
}

/// TTL and refresh behavior of a broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
	/// Age after which a cached token is stale.
	#[serde(rename = "ttl_seconds", with = "ttl_seconds")]
	pub ttl: Duration,
	/// Refresh behavior for absent or stale tokens.
	pub refresh_mode: RefreshMode,
}
impl BrokerSettings {
	/// Overrides the TTL, clamped to `0..=MAX_TTL`.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl.clamp(Duration::ZERO, MAX_TTL);

		self
	}

	/// Overrides the refresh mode.
	pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
		self.refresh_mode = mode;

		self
	}
}
impl Default for BrokerSettings {
	fn default() -> Self {
		Self { ttl: DEFAULT_TTL, refresh_mode: RefreshMode::default() }
	}
}

mod ttl_seconds {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as _};
	// self
	use crate::{_prelude::*, auth::MAX_TTL};

	pub fn serialize<S>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(ttl.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let seconds = i64::deserialize(deserializer)?;

		if seconds <= 0 || seconds > MAX_TTL.whole_seconds() {
			return Err(D::Error::custom(format!(
				"ttl_seconds must be between 1 and {}",
				MAX_TTL.whole_seconds()
			)));
		}

		Ok(Duration::seconds(seconds))
	}
}

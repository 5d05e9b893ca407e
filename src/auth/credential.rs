//! Cached credential record and its time-to-live lifecycle.

// self
use crate::{_prelude::*, auth::TokenSecret, request::AcquisitionRequest};

/// Validity window applied to every cached token regardless of its server-side expiry.
pub const DEFAULT_TTL: Duration = Duration::hours(1);
/// Longest TTL a broker accepts.
pub const MAX_TTL: Duration = Duration::days(365);

/// Lifecycle state of the single cached credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
	/// Nothing usable is cached (cold start, or token/timestamp missing).
	Absent,
	/// A token is cached and younger than the TTL.
	Valid,
	/// A token is cached but older than the TTL.
	Stale,
}
impl TokenState {
	/// Evaluates the state of an optional credential at `now`.
	pub fn of(credential: Option<&CachedCredential>, now: OffsetDateTime, ttl: Duration) -> Self {
		match credential {
			Some(credential) => credential.state_at(now, ttl),
			None => Self::Absent,
		}
	}

	/// Returns `true` for states that call for a new acquisition.
	pub const fn needs_refresh(self) -> bool {
		matches!(self, Self::Absent | Self::Stale)
	}

	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Absent => "absent",
			Self::Valid => "valid",
			Self::Stale => "stale",
		}
	}
}
impl Display for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity token together with the instant it was obtained.
#[derive(Clone)]
pub struct CachedCredential {
	/// Bearer identity token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant the token was obtained.
	pub issued_at: OffsetDateTime,
	/// Request that re-acquires the token, when one is known.
	pub acquisition_request: Option<AcquisitionRequest>,
}
impl CachedCredential {
	/// Creates a credential issued at the provided instant.
	pub fn new(token: impl Into<String>, issued_at: OffsetDateTime) -> Self {
		Self { token: TokenSecret::new(token), issued_at, acquisition_request: None }
	}

	/// Convenience helper that stamps `issued_at` with the current clock.
	pub fn issued_now(token: impl Into<String>) -> Self {
		Self::new(token, OffsetDateTime::now_utc())
	}

	/// Attaches the request that produced (and can reproduce) this credential.
	pub fn with_acquisition_request(mut self, request: AcquisitionRequest) -> Self {
		self.acquisition_request = Some(request);

		self
	}

	/// Age of the credential at `now`.
	pub fn age_at(&self, now: OffsetDateTime) -> Duration {
		now - self.issued_at
	}

	/// Instant after which the credential turns stale under `ttl`.
	///
	/// Returns `None` when that instant lies beyond the representable range.
	pub fn stale_after(&self, ttl: Duration) -> Option<OffsetDateTime> {
		self.issued_at.checked_add(ttl)
	}

	/// Computes the lifecycle state at `now`.
	///
	/// The credential stays valid while its age does not exceed `ttl`; an age exactly equal to
	/// the TTL is still valid.
	pub fn state_at(&self, now: OffsetDateTime, ttl: Duration) -> TokenState {
		if self.age_at(now) > ttl { TokenState::Stale } else { TokenState::Valid }
	}

	/// Returns `true` if the credential is stale at `now`.
	pub fn is_stale_at(&self, now: OffsetDateTime, ttl: Duration) -> bool {
		matches!(self.state_at(now, ttl), TokenState::Stale)
	}

	/// Returns `true` if the credential is stale relative to the current clock.
	pub fn is_stale(&self, ttl: Duration) -> bool {
		self.is_stale_at(OffsetDateTime::now_utc(), ttl)
	}

	/// Returns `true` when both credentials carry the same token minted at the same instant.
	pub fn same_issue(&self, other: &Self) -> bool {
		self.issued_at == other.issued_at && self.token == other.token
	}
}
impl Debug for CachedCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedCredential")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("acquisition_request", &self.acquisition_request)
			.finish()
	}
}

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh attempts.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refreshes (including reuse of a token another caller
	/// just stored).
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refreshes.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_outcome<T, E>(&self, result: &Result<T, E>) {
		match result {
			Ok(_) => self.success.fetch_add(1, Ordering::Relaxed),
			Err(_) => self.failure.fetch_add(1, Ordering::Relaxed),
		};
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_are_counted_separately() {
		let metrics = RefreshMetrics::default();

		metrics.record_attempt();
		metrics.record_outcome::<(), ()>(&Ok(()));
		metrics.record_attempt();
		metrics.record_outcome::<(), ()>(&Err(()));

		assert_eq!((metrics.attempts(), metrics.successes(), metrics.failures()), (2, 1, 1));
	}
}

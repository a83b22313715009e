use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Hands out the generation number stamped on each spawned run.
#[derive(Debug, Default, Clone)]
pub(crate) struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// The first call to [`Self::next`] returns 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the clock. Safe to call from any thread.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Generation-scoped cancellation token for one background run.
///
/// Each spawned thread gets its own token, so a run that was detached after
/// a stop timeout keeps observing its own cancellation even after the
/// controller has moved on to a newer generation.
#[derive(Debug, Clone)]
pub(crate) struct RunToken {
	generation: u64,
	cancel: CancellationToken,
}

impl RunToken {
	/// Creates a fresh token for `generation`.
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generations_start_at_one_and_increase() {
		let clock = GenerationClock::new();
		assert_eq!(clock.next(), 1);
		assert_eq!(clock.next(), 2);
		assert_eq!(clock.clone().next(), 3);
	}

	#[test]
	fn cancel_is_shared_between_clones() {
		let token = RunToken::new(7);
		let observer = token.clone();
		assert!(!observer.is_cancelled());
		token.cancel();
		assert!(observer.is_cancelled());
		assert_eq!(observer.generation(), 7);
	}
}

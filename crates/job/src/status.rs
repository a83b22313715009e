use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::exit::JobExit;
use crate::token::RunToken;

/// Lifecycle status shared between the controller and its background run.
#[derive(Debug, Default)]
pub(crate) struct Status {
	/// Caller intent: keep iterating.
	pub running: bool,
	/// A thread handle is held by the controller.
	pub attached: bool,
	/// Generation of the most recently spawned run.
	pub generation: u64,
	/// Generation whose thread has not finished its exit bookkeeping yet.
	pub live: Option<u64>,
	pub last_exit: Option<JobExit>,
}

impl Status {
	pub fn is_running(&self) -> bool {
		self.running && self.attached
	}

	/// Whether the run for `generation` has passed its exit bookkeeping.
	pub fn has_exited(&self, generation: u64) -> bool {
		self.live != Some(generation)
	}
}

/// [`Status`] behind a mutex, with a condvar notified on every change that
/// waiters care about (intent cleared, run exited, cancellation requested).
#[derive(Debug, Default)]
pub(crate) struct StatusCell {
	state: Mutex<Status>,
	changed: Condvar,
}

impl StatusCell {
	pub fn lock(&self) -> MutexGuard<'_, Status> {
		self.state.lock()
	}

	pub fn notify(&self) {
		self.changed.notify_all();
	}

	/// Blocks until `done` holds or `timeout` elapses. Returns the final
	/// value of `done`.
	pub fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&Status) -> bool) -> bool {
		let mut state = self.state.lock();
		if done(&*state) {
			return true;
		}
		if timeout.is_zero() {
			return false;
		}
		let _ = self.changed.wait_while_for(&mut state, |s| !done(&*s), timeout);
		done(&*state)
	}

	/// Blocks until `token` is cancelled or `timeout` elapses.
	///
	/// Relies on cancellers calling [`Self::notify`] after cancelling.
	pub fn wait_cancelled(&self, token: &RunToken, timeout: Duration) -> bool {
		self.wait_until(timeout, |_| token.is_cancelled())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::thread;
	use std::time::Instant;

	use super::*;

	#[test]
	fn wait_until_times_out_when_condition_never_holds() {
		let cell = StatusCell::default();
		let start = Instant::now();
		assert!(!cell.wait_until(Duration::from_millis(30), |s| !s.running && s.attached));
		assert!(start.elapsed() >= Duration::from_millis(30));
	}

	#[test]
	fn wait_until_wakes_on_notify() {
		let cell = Arc::new(StatusCell::default());
		cell.lock().running = true;

		let waker = Arc::clone(&cell);
		let handle = thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			waker.lock().running = false;
			waker.notify();
		});

		let start = Instant::now();
		assert!(cell.wait_until(Duration::from_secs(5), |s| !s.running));
		assert!(start.elapsed() < Duration::from_secs(5));
		handle.join().unwrap();
	}

	#[test]
	fn running_requires_attached_thread() {
		let status = Status {
			running: true,
			..Status::default()
		};
		assert!(!status.is_running());
		assert!(status.has_exited(1));
	}
}
